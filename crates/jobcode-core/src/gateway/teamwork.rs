//! Teamwork Projects (v1 JSON API) client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::http::{Credentials, HttpClient};
use super::{id_string, TaskTracker};
use crate::error::Result;
use crate::types::{normalize_abbreviation, Company, NewTaskTimeEntry, TaskPerson, TaskProject};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProjectEnvelope {
    project: WireProject,
}

#[derive(Deserialize)]
struct ProjectsEnvelope {
    #[serde(default)]
    projects: Vec<WireProject>,
}

#[derive(Deserialize)]
struct WireProject {
    #[serde(with = "id_string")]
    id: String,
    name: String,
    company: WireCompanyRef,
}

#[derive(Deserialize)]
struct WireCompanyRef {
    #[serde(with = "id_string")]
    id: String,
}

#[derive(Deserialize)]
struct CompanyEnvelope {
    company: WireCompany,
}

#[derive(Deserialize)]
struct WireCompany {
    #[serde(with = "id_string")]
    id: String,
    #[serde(default)]
    name: String,
    /// Teamwork has no abbreviation field; the first address line holds it.
    #[serde(default)]
    address_one: Option<String>,
}

#[derive(Deserialize)]
struct PeopleEnvelope {
    #[serde(default)]
    people: Vec<WirePerson>,
}

#[derive(Deserialize)]
struct WirePerson {
    #[serde(with = "id_string")]
    id: String,
    #[serde(rename = "email-address", default)]
    email: String,
}

#[derive(Serialize)]
struct ProjectUpdate<'a> {
    project: ProjectName<'a>,
}

#[derive(Serialize)]
struct ProjectName<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct TimeEntryEnvelope {
    #[serde(rename = "time-entry")]
    entry: WireTimeEntry,
}

#[derive(Serialize)]
struct WireTimeEntry {
    description: String,
    #[serde(rename = "person-id")]
    person_id: String,
    date: String,
    hours: String,
    minutes: String,
    isbillable: bool,
}

impl From<WireProject> for TaskProject {
    fn from(p: WireProject) -> Self {
        TaskProject {
            id: p.id,
            name: p.name,
            company_id: p.company.id,
        }
    }
}

impl From<&NewTaskTimeEntry> for WireTimeEntry {
    fn from(e: &NewTaskTimeEntry) -> Self {
        let total_minutes = (e.hours.max(0.0) * 60.0).round() as u64;
        WireTimeEntry {
            description: e.description.clone(),
            person_id: e.person_id.clone(),
            date: e.date.format("%Y%m%d").to_string(),
            hours: (total_minutes / 60).to_string(),
            minutes: (total_minutes % 60).to_string(),
            isbillable: e.billable,
        }
    }
}

// ---------------------------------------------------------------------------
// TeamworkClient
// ---------------------------------------------------------------------------

pub struct TeamworkClient {
    http: HttpClient,
}

impl TeamworkClient {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, credentials, timeout)?,
        })
    }
}

impl TaskTracker for TeamworkClient {
    fn get_project(&self, id: &str) -> Result<Option<TaskProject>> {
        let envelope: Option<ProjectEnvelope> = self.http.get(&format!("projects/{id}.json"))?;
        Ok(envelope.map(|e| e.project.into()))
    }

    fn get_projects(&self) -> Result<Vec<TaskProject>> {
        let envelope: Option<ProjectsEnvelope> = self.http.get("projects.json")?;
        Ok(envelope
            .map(|e| e.projects.into_iter().map(Into::into).collect())
            .unwrap_or_default())
    }

    fn update_project(&self, name: &str, id: &str) -> Result<()> {
        tracing::info!(project_id = %id, %name, "renaming Teamwork project");
        self.http.put(
            &format!("projects/{id}.json"),
            &ProjectUpdate {
                project: ProjectName { name },
            },
        )
    }

    fn get_company(&self, id: &str) -> Result<Option<Company>> {
        let envelope: Option<CompanyEnvelope> = self.http.get(&format!("companies/{id}.json"))?;
        Ok(envelope.map(|e| Company {
            id: e.company.id,
            name: e.company.name,
            abbreviation: normalize_abbreviation(e.company.address_one.as_deref()),
        }))
    }

    fn get_project_people(&self, id: &str) -> Result<Vec<TaskPerson>> {
        let envelope: Option<PeopleEnvelope> =
            self.http.get(&format!("projects/{id}/people.json"))?;
        Ok(envelope
            .map(|e| {
                e.people
                    .into_iter()
                    .map(|p| TaskPerson {
                        id: p.id,
                        email: p.email,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn add_time_entry(&self, project_id: &str, entry: &NewTaskTimeEntry) -> Result<()> {
        tracing::info!(
            %project_id,
            person_id = %entry.person_id,
            hours = entry.hours,
            "logging Teamwork time entry"
        );
        self.http.post(
            &format!("projects/{project_id}/time_entries.json"),
            &TimeEntryEnvelope {
                entry: entry.into(),
            },
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
