//! Harvest (classic API) client.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::http::{id_from_location, Credentials, HttpClient};
use super::{id_string, TimeTracker};
use crate::error::{JobcodeError, Result};
use crate::types::{Client, TimeEntry, TimeProject, TimeUser};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ClientEnvelope {
    client: WireClient,
}

#[derive(Deserialize)]
struct WireClient {
    #[serde(with = "id_string")]
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ProjectEnvelope {
    project: WireProject,
}

#[derive(Deserialize)]
struct WireProject {
    #[serde(with = "id_string")]
    id: String,
    name: String,
    #[serde(with = "id_string")]
    client_id: String,
}

#[derive(Deserialize)]
struct AssignmentEnvelope {
    user_assignment: WireAssignment,
}

#[derive(Deserialize)]
struct WireAssignment {
    #[serde(with = "id_string")]
    user_id: String,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: WireUser,
}

#[derive(Deserialize)]
struct WireUser {
    #[serde(with = "id_string")]
    id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct DayEntryEnvelope {
    day_entry: WireDayEntry,
}

#[derive(Deserialize)]
struct WireDayEntry {
    #[serde(with = "id_string")]
    id: String,
    #[serde(with = "id_string")]
    user_id: String,
    hours: f64,
    #[serde(default)]
    notes: Option<String>,
    spent_at: NaiveDate,
}

#[derive(Serialize)]
struct NewClient<'a> {
    client: ClientName<'a>,
}

#[derive(Serialize)]
struct ClientName<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct ProjectBody<'a> {
    project: ProjectFields<'a>,
}

#[derive(Serialize)]
struct ProjectFields<'a> {
    name: &'a str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bill_by: Option<&'static str>,
}

#[derive(Serialize)]
struct AssignUser<'a> {
    user: UserRef<'a>,
}

#[derive(Serialize)]
struct UserRef<'a> {
    id: &'a str,
}

impl From<WireProject> for TimeProject {
    fn from(p: WireProject) -> Self {
        TimeProject {
            id: p.id,
            name: p.name,
            client_id: p.client_id,
        }
    }
}

impl From<WireUser> for TimeUser {
    fn from(u: WireUser) -> Self {
        TimeUser {
            id: u.id,
            email: u.email,
        }
    }
}

fn created_id(kind: &str, location: Option<String>) -> Result<String> {
    location
        .as_deref()
        .and_then(id_from_location)
        .ok_or_else(|| JobcodeError::Transport(format!("created {kind} without a Location header")))
}

// ---------------------------------------------------------------------------
// HarvestClient
// ---------------------------------------------------------------------------

pub struct HarvestClient {
    http: HttpClient,
}

impl HarvestClient {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, credentials, timeout)?,
        })
    }

    fn list_projects(&self, path: &str) -> Result<Vec<TimeProject>> {
        let list: Option<Vec<ProjectEnvelope>> = self.http.get(path)?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.project.into())
            .collect())
    }
}

impl TimeTracker for HarvestClient {
    fn get_clients(&self) -> Result<Vec<Client>> {
        let list: Option<Vec<ClientEnvelope>> = self.http.get("clients")?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|e| Client {
                id: e.client.id,
                name: e.client.name,
            })
            .collect())
    }

    fn create_client(&self, name: &str) -> Result<String> {
        tracing::info!(%name, "creating Harvest client");
        let location = self.http.post(
            "clients",
            &NewClient {
                client: ClientName { name },
            },
        )?;
        created_id("client", location)
    }

    fn get_projects(&self) -> Result<Vec<TimeProject>> {
        self.list_projects("projects")
    }

    fn get_projects_updated_since(&self, day: NaiveDate) -> Result<Vec<TimeProject>> {
        self.list_projects(&format!(
            "projects?updated_since={}+00:01",
            day.format("%Y-%m-%d")
        ))
    }

    fn create_project(&self, name: &str, client_id: &str) -> Result<String> {
        tracing::info!(%name, %client_id, "creating Harvest project");
        let location = self.http.post(
            "projects",
            &ProjectBody {
                project: ProjectFields {
                    name,
                    client_id,
                    bill_by: Some("Tasks"),
                },
            },
        )?;
        created_id("project", location)
    }

    fn update_project(&self, id: &str, name: &str, client_id: &str) -> Result<()> {
        tracing::info!(project_id = %id, %name, %client_id, "updating Harvest project");
        self.http.put(
            &format!("projects/{id}"),
            &ProjectBody {
                project: ProjectFields {
                    name,
                    client_id,
                    bill_by: None,
                },
            },
        )
    }

    fn get_project_people(&self, id: &str) -> Result<Vec<String>> {
        let list: Option<Vec<AssignmentEnvelope>> =
            self.http.get(&format!("projects/{id}/user_assignments"))?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.user_assignment.user_id)
            .collect())
    }

    fn get_people(&self) -> Result<Vec<TimeUser>> {
        let list: Option<Vec<UserEnvelope>> = self.http.get("people")?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.user.into())
            .collect())
    }

    fn get_person(&self, id: &str) -> Result<Option<TimeUser>> {
        let envelope: Option<UserEnvelope> = self.http.get(&format!("people/{id}"))?;
        Ok(envelope.map(|e| e.user.into()))
    }

    fn add_user_assignment(&self, project_id: &str, user_id: &str) -> Result<()> {
        tracing::info!(%project_id, %user_id, "assigning user to Harvest project");
        self.http.post(
            &format!("projects/{project_id}/user_assignments"),
            &AssignUser {
                user: UserRef { id: user_id },
            },
        )?;
        Ok(())
    }

    fn remove_user_assignment(&self, project_id: &str, user_id: &str) -> Result<()> {
        tracing::info!(%project_id, %user_id, "removing user from Harvest project");
        self.http
            .delete(&format!("projects/{project_id}/user_assignments/{user_id}"))
    }

    fn get_project_entries(
        &self,
        project_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimeEntry>> {
        let list: Option<Vec<DayEntryEnvelope>> = self.http.get(&format!(
            "projects/{project_id}/entries?from={}&to={}",
            from.format("%Y%m%d"),
            to.format("%Y%m%d")
        ))?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|e| TimeEntry {
                id: e.day_entry.id,
                user_id: e.day_entry.user_id,
                hours: e.day_entry.hours,
                notes: e.day_entry.notes.unwrap_or_default(),
                spent_at: e.day_entry.spent_at,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
