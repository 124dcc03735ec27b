//! In-memory gateways for exercising the engine without a network.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::{JobcodeError, Result};
use crate::gateway::{TaskTracker, TimeTracker};
use crate::types::{
    Client, Company, NewTaskTimeEntry, TaskPerson, TaskProject, TimeEntry, TimeProject, TimeUser,
};

/// The error the HTTP gateway returns when the remote object is gone.
fn not_found(method: &'static str, url: &str) -> JobcodeError {
    JobcodeError::Http {
        method,
        url: url.to_string(),
        status: 404,
    }
}

// ---------------------------------------------------------------------------
// FakeTeamwork
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeTeamwork {
    pub projects: Mutex<BTreeMap<String, TaskProject>>,
    pub companies: Mutex<BTreeMap<String, Company>>,
    pub people: Mutex<BTreeMap<String, Vec<TaskPerson>>>,
    pub renames: Mutex<Vec<(String, String)>>,
    pub time_entries: Mutex<Vec<(String, NewTaskTimeEntry)>>,
}

impl FakeTeamwork {
    pub fn with_company(self, id: &str, name: &str, abbreviation: Option<&str>) -> Self {
        self.companies.lock().unwrap().insert(
            id.into(),
            Company {
                id: id.into(),
                name: name.into(),
                abbreviation: abbreviation.map(str::to_string),
            },
        );
        self
    }

    pub fn with_project(self, id: &str, name: &str, company_id: &str) -> Self {
        self.projects.lock().unwrap().insert(
            id.into(),
            TaskProject {
                id: id.into(),
                name: name.into(),
                company_id: company_id.into(),
            },
        );
        self
    }

    pub fn with_people(self, project_id: &str, people: &[(&str, &str)]) -> Self {
        self.people.lock().unwrap().insert(
            project_id.into(),
            people
                .iter()
                .map(|(id, email)| TaskPerson {
                    id: id.to_string(),
                    email: email.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn set_abbreviation(&self, company_id: &str, abbreviation: Option<&str>) {
        if let Some(c) = self.companies.lock().unwrap().get_mut(company_id) {
            c.abbreviation = abbreviation.map(str::to_string);
        }
    }

    pub fn project_name(&self, id: &str) -> String {
        self.projects.lock().unwrap()[id].name.clone()
    }

    pub fn renames(&self) -> Vec<(String, String)> {
        self.renames.lock().unwrap().clone()
    }
}

impl TaskTracker for FakeTeamwork {
    fn get_project(&self, id: &str) -> Result<Option<TaskProject>> {
        Ok(self.projects.lock().unwrap().get(id).cloned())
    }

    fn get_projects(&self) -> Result<Vec<TaskProject>> {
        Ok(self.projects.lock().unwrap().values().cloned().collect())
    }

    fn update_project(&self, name: &str, id: &str) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(id)
            .ok_or_else(|| not_found("PUT", &format!("/projects/{id}.json")))?;
        project.name = name.to_string();
        self.renames
            .lock()
            .unwrap()
            .push((id.to_string(), name.to_string()));
        Ok(())
    }

    fn get_company(&self, id: &str) -> Result<Option<Company>> {
        Ok(self.companies.lock().unwrap().get(id).cloned())
    }

    fn get_project_people(&self, id: &str) -> Result<Vec<TaskPerson>> {
        Ok(self
            .people
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn add_time_entry(&self, project_id: &str, entry: &NewTaskTimeEntry) -> Result<()> {
        self.time_entries
            .lock()
            .unwrap()
            .push((project_id.to_string(), entry.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeHarvest
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeHarvest {
    pub clients: Mutex<Vec<Client>>,
    pub projects: Mutex<Vec<TimeProject>>,
    pub updated_today: Mutex<BTreeSet<String>>,
    pub assignments: Mutex<BTreeMap<String, Vec<String>>>,
    pub people: Mutex<Vec<TimeUser>>,
    pub entries: Mutex<BTreeMap<String, Vec<TimeEntry>>>,
    /// User ids whose add/remove calls fail.
    pub broken_users: Mutex<BTreeSet<String>>,
    next_id: Mutex<u64>,
}

impl FakeHarvest {
    fn next_id(&self) -> String {
        let mut n = self.next_id.lock().unwrap();
        *n += 1;
        format!("h{}", *n)
    }

    pub fn with_client(self, id: &str, name: &str) -> Self {
        self.clients.lock().unwrap().push(Client {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_project(self, id: &str, name: &str, client_id: &str) -> Self {
        self.projects.lock().unwrap().push(TimeProject {
            id: id.into(),
            name: name.into(),
            client_id: client_id.into(),
        });
        self
    }

    pub fn with_user(self, id: &str, email: &str) -> Self {
        self.people.lock().unwrap().push(TimeUser {
            id: id.into(),
            email: email.into(),
        });
        self
    }

    pub fn with_assignments(self, project_id: &str, user_ids: &[&str]) -> Self {
        self.assignments.lock().unwrap().insert(
            project_id.into(),
            user_ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_entries(self, project_id: &str, entries: Vec<TimeEntry>) -> Self {
        self.updated_today.lock().unwrap().insert(project_id.into());
        self.entries
            .lock()
            .unwrap()
            .insert(project_id.into(), entries);
        self
    }

    pub fn break_user(&self, user_id: &str) {
        self.broken_users.lock().unwrap().insert(user_id.into());
    }

    pub fn project_names(&self) -> Vec<String> {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn client_names(&self) -> Vec<String> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn assigned(&self, project_id: &str) -> Vec<String> {
        let mut ids = self
            .assignments
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl TimeTracker for FakeHarvest {
    fn get_clients(&self) -> Result<Vec<Client>> {
        Ok(self.clients.lock().unwrap().clone())
    }

    fn create_client(&self, name: &str) -> Result<String> {
        let id = self.next_id();
        self.clients.lock().unwrap().push(Client {
            id: id.clone(),
            name: name.into(),
        });
        Ok(id)
    }

    fn get_projects(&self) -> Result<Vec<TimeProject>> {
        Ok(self.projects.lock().unwrap().clone())
    }

    fn get_projects_updated_since(&self, _day: NaiveDate) -> Result<Vec<TimeProject>> {
        let updated = self.updated_today.lock().unwrap();
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| updated.contains(&p.id))
            .cloned()
            .collect())
    }

    fn create_project(&self, name: &str, client_id: &str) -> Result<String> {
        let id = self.next_id();
        self.projects.lock().unwrap().push(TimeProject {
            id: id.clone(),
            name: name.into(),
            client_id: client_id.into(),
        });
        Ok(id)
    }

    fn update_project(&self, id: &str, name: &str, client_id: &str) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("PATCH", &format!("/v2/projects/{id}")))?;
        project.name = name.into();
        project.client_id = client_id.into();
        Ok(())
    }

    fn get_project_people(&self, id: &str) -> Result<Vec<String>> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_people(&self) -> Result<Vec<TimeUser>> {
        Ok(self.people.lock().unwrap().clone())
    }

    fn get_person(&self, id: &str) -> Result<Option<TimeUser>> {
        Ok(self
            .people
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    fn add_user_assignment(&self, project_id: &str, user_id: &str) -> Result<()> {
        if self.broken_users.lock().unwrap().contains(user_id) {
            return Err(JobcodeError::Http {
                method: "POST",
                url: format!("/projects/{project_id}/user_assignments"),
                status: 500,
            });
        }
        self.assignments
            .lock()
            .unwrap()
            .entry(project_id.into())
            .or_default()
            .push(user_id.into());
        Ok(())
    }

    fn remove_user_assignment(&self, project_id: &str, user_id: &str) -> Result<()> {
        if self.broken_users.lock().unwrap().contains(user_id) {
            return Err(JobcodeError::Http {
                method: "DELETE",
                url: format!("/projects/{project_id}/user_assignments/{user_id}"),
                status: 500,
            });
        }
        if let Some(ids) = self.assignments.lock().unwrap().get_mut(project_id) {
            ids.retain(|id| id != user_id);
        }
        Ok(())
    }

    fn get_project_entries(
        &self,
        project_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimeEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.spent_at >= from && e.spent_at <= to)
            .collect())
    }
}
