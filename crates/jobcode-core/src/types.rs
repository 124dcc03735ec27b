//! Typed records for the resources both services expose.
//!
//! Gateways decode wire payloads into these at the boundary, so the
//! reconciliation code never digs through raw JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Task-tracking side (Teamwork)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProject {
    pub id: String,
    pub name: String,
    pub company_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Client abbreviation. `None` when the field is absent or blank.
    pub abbreviation: Option<String>,
}

impl Company {
    pub fn abbreviation(&self) -> Option<&str> {
        self.abbreviation.as_deref()
    }
}

/// Normalize a raw abbreviation field: trimmed, and `None` when blank.
pub fn normalize_abbreviation(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPerson {
    pub id: String,
    pub email: String,
}

/// A time entry to be logged against a task-tracking project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskTimeEntry {
    pub person_id: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub billable: bool,
}

// ---------------------------------------------------------------------------
// Time-tracking side (Harvest)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeProject {
    pub id: String,
    pub name: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub hours: f64,
    #[serde(default)]
    pub notes: String,
    pub spent_at: NaiveDate,
}
