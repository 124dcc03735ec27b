//! Interfaces to the two external services.
//!
//! The reconciliation engine only sees the [`TaskTracker`] and
//! [`TimeTracker`] traits. Lookups return `Ok(None)` when the remote
//! resource does not exist; every other failure is an `Err`.

pub mod harvest;
mod http;
pub mod teamwork;

pub use harvest::HarvestClient;
pub use http::Credentials;
pub use teamwork::TeamworkClient;

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{
    Client, Company, NewTaskTimeEntry, TaskPerson, TaskProject, TimeEntry, TimeProject, TimeUser,
};

/// The task-tracking service (Teamwork).
pub trait TaskTracker: Send + Sync {
    fn get_project(&self, id: &str) -> Result<Option<TaskProject>>;

    fn get_projects(&self) -> Result<Vec<TaskProject>>;

    fn get_project_by_name(&self, name: &str) -> Result<Option<TaskProject>> {
        Ok(self.get_projects()?.into_iter().find(|p| p.name == name))
    }

    fn update_project(&self, name: &str, id: &str) -> Result<()>;

    fn get_company(&self, id: &str) -> Result<Option<Company>>;

    fn get_project_people(&self, id: &str) -> Result<Vec<TaskPerson>>;

    fn add_time_entry(&self, project_id: &str, entry: &NewTaskTimeEntry) -> Result<()>;
}

/// The time-tracking service (Harvest).
pub trait TimeTracker: Send + Sync {
    fn get_clients(&self) -> Result<Vec<Client>>;

    fn get_client_by_name(&self, name: &str) -> Result<Option<Client>> {
        Ok(self.get_clients()?.into_iter().find(|c| c.name == name))
    }

    /// Returns the id of the new client.
    fn create_client(&self, name: &str) -> Result<String>;

    fn get_projects(&self) -> Result<Vec<TimeProject>>;

    fn get_project_by_name(&self, name: &str) -> Result<Option<TimeProject>> {
        Ok(self.get_projects()?.into_iter().find(|p| p.name == name))
    }

    /// First project whose name starts with `prefix`, optionally limited to
    /// one client.
    fn get_project_by_prefix(
        &self,
        prefix: &str,
        client_id: Option<&str>,
    ) -> Result<Option<TimeProject>> {
        Ok(self.get_projects()?.into_iter().find(|p| {
            p.name.starts_with(prefix) && client_id.map_or(true, |c| p.client_id == c)
        }))
    }

    fn get_projects_updated_since(&self, day: NaiveDate) -> Result<Vec<TimeProject>>;

    /// Returns the id of the new project.
    fn create_project(&self, name: &str, client_id: &str) -> Result<String>;

    fn update_project(&self, id: &str, name: &str, client_id: &str) -> Result<()>;

    /// Ids of the users assigned to a project.
    fn get_project_people(&self, id: &str) -> Result<Vec<String>>;

    fn get_people(&self) -> Result<Vec<TimeUser>>;

    fn get_person(&self, id: &str) -> Result<Option<TimeUser>>;

    fn get_person_by_email(&self, email: &str) -> Result<Option<TimeUser>> {
        Ok(self
            .get_people()?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    fn add_user_assignment(&self, project_id: &str, user_id: &str) -> Result<()>;

    fn remove_user_assignment(&self, project_id: &str, user_id: &str) -> Result<()>;

    fn get_project_entries(
        &self,
        project_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimeEntry>>;
}

/// Accept ids written either as JSON strings or numbers.
pub(crate) mod id_string {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Raw::deserialize(d)? {
            Raw::Str(s) => s,
            Raw::Num(n) => n.to_string(),
        })
    }
}
