//! Canonical project names: `YYMM-CLIENT-NNN title`.
//!
//! A name either carries a project code (date, client abbreviation, job
//! number) followed by free text, or it is unstructured. Unstructured names
//! are not an error here: the reconciliation engine uses them to tell a
//! freshly created project from one it has already coded.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{JobcodeError, Result};

static CANONICAL_RE: OnceLock<Regex> = OnceLock::new();

fn canonical_re() -> &'static Regex {
    CANONICAL_RE.get_or_init(|| Regex::new(r"^(\d{4})-([A-Z]+)-(\d+) (.+)$").unwrap())
}

static CLIENT_RE: OnceLock<Regex> = OnceLock::new();

fn client_re() -> &'static Regex {
    CLIENT_RE.get_or_init(|| Regex::new(r"^[A-Z]+$").unwrap())
}

/// True when `s` can be the client part of a project code.
pub fn is_client_abbreviation(s: &str) -> bool {
    client_re().is_match(s)
}

// ---------------------------------------------------------------------------
// ProjectCode
// ---------------------------------------------------------------------------

/// The `YYMM-CLIENT-NNN` prefix of a canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCode {
    pub date: String,
    pub client: String,
    pub job_number: u32,
    /// Digit count the job number was written with; keeps zero padding.
    #[serde(skip)]
    width: usize,
}

impl ProjectCode {
    pub fn new(date: &str, client: &str, job_number: u32) -> Result<Self> {
        if date.len() != 4 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(JobcodeError::UnstructuredName(format!(
                "{date}-{client}-{job_number}"
            )));
        }
        if !client_re().is_match(client) {
            return Err(JobcodeError::UnstructuredName(format!(
                "{date}-{client}-{job_number}"
            )));
        }
        Ok(Self {
            date: date.to_string(),
            client: client.to_string(),
            job_number,
            width: 0,
        })
    }

    /// Same code with a different client; date and job number are kept.
    pub fn with_client(&self, client: &str) -> Result<Self> {
        let mut code = ProjectCode::new(&self.date, client, self.job_number)?;
        code.width = self.width;
        Ok(code)
    }
}

impl fmt::Display for ProjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.date,
            self.client,
            self.job_number,
            width = self.width
        )
    }
}

// ---------------------------------------------------------------------------
// CanonicalName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalName {
    pub code: ProjectCode,
    pub title: String,
}

impl CanonicalName {
    /// Build a canonical name. A title that already starts with a project
    /// code has exactly one such prefix removed first.
    pub fn new(code: ProjectCode, title: &str) -> Result<Self> {
        let title = strip_code(title);
        if title.is_empty() || title.contains('\n') {
            return Err(JobcodeError::UnstructuredName(format!("{code} {title}")));
        }
        Ok(Self {
            code,
            title: title.to_string(),
        })
    }

    pub fn client(&self) -> &str {
        &self.code.client
    }

    pub fn job_number(&self) -> u32 {
        self.code.job_number
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.title)
    }
}

impl FromStr for CanonicalName {
    type Err = JobcodeError;

    fn from_str(s: &str) -> Result<Self> {
        match parse(s) {
            ParsedName::Structured(name) => Ok(name),
            ParsedName::Unstructured => Err(JobcodeError::UnstructuredName(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    Structured(CanonicalName),
    Unstructured,
}

/// Split a project name into its code and title.
pub fn parse(name: &str) -> ParsedName {
    let Some(caps) = canonical_re().captures(name) else {
        return ParsedName::Unstructured;
    };
    let digits = &caps[3];
    // A job number too large for u32 cannot have come from the allocator.
    let Ok(job_number) = digits.parse::<u32>() else {
        return ParsedName::Unstructured;
    };
    ParsedName::Structured(CanonicalName {
        code: ProjectCode {
            date: caps[1].to_string(),
            client: caps[2].to_string(),
            job_number,
            width: digits.len(),
        },
        title: caps[4].to_string(),
    })
}

/// Remove one leading project code from `name`, if present.
pub fn strip_code(name: &str) -> &str {
    match canonical_re().captures(name) {
        Some(caps) => caps.get(4).map_or(name, |m| m.as_str()),
        None => name,
    }
}

/// `YYMM` for a calendar date.
pub fn yymm(date: NaiveDate) -> String {
    format!("{:02}{:02}", date.year().rem_euclid(100), date.month())
}

/// Format a canonical name from its parts. `date` defaults to the month of
/// `today`.
pub fn format(
    date: Option<&str>,
    client: &str,
    job_number: u32,
    title: &str,
    today: NaiveDate,
) -> Result<String> {
    let date = match date {
        Some(d) => d.to_string(),
        None => yymm(today),
    };
    let code = ProjectCode::new(&date, client, job_number)?;
    Ok(CanonicalName::new(code, title)?.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
