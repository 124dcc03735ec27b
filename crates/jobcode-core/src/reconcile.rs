//! Keeps Teamwork project names coded and Harvest in step with them.
//!
//! # Flow
//!
//! ```text
//! PROJECT.CREATED / UPDATED / COPIED ──► route_project
//!                                          ├─ unstructured name ──► create_project_flow
//!                                          └─ canonical name    ──► update_project_flow ──► reconcile_roster
//! COMPANY.CREATED ──► create_counterpart_client
//! COMPANY.UPDATED ──► ensure_counterpart_client
//! ```
//!
//! Every branch that cannot proceed because something is missing on either
//! side logs and returns [`Outcome::Skipped`]. Only gateway and sequence
//! store failures surface as `Err`, and those end the current event.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::error::Result;
use crate::event::{EventKind, WebhookEvent};
use crate::gateway::{TaskTracker, TimeTracker};
use crate::name::{self, CanonicalName, ParsedName, ProjectCode};
use crate::roster::{self, EmailRoster};
use crate::sequence::SequenceDb;
use crate::types::{Company, TaskProject};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// First sighting: the project received a code. `time_project_id` is set
    /// when a Harvest project was created for it.
    Coded {
        name: String,
        time_project_id: Option<String>,
    },
    /// The company abbreviation changed and the project was renamed.
    Renamed {
        from: String,
        to: String,
        time_project_renamed: bool,
        roster: Option<RosterReport>,
    },
    /// Already coded with the current abbreviation; only the roster was synced.
    Unchanged {
        name: String,
        roster: Option<RosterReport>,
    },
    ClientCreated {
        name: String,
    },
    ClientExists {
        name: String,
    },
    Skipped {
        reason: String,
    },
}

impl Outcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// What a roster pass changed on the Harvest side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Task-side emails with no Harvest user.
    pub unknown_emails: Vec<String>,
    pub failures: usize,
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Anything that can consume webhook events. The server holds one of these.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &WebhookEvent) -> Result<Outcome>;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<T, H> {
    task: T,
    time: H,
    db: SequenceDb,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl<T: TaskTracker, H: TimeTracker> Engine<T, H> {
    pub fn new(task: T, time: H, db: SequenceDb) -> Self {
        Self {
            task,
            time,
            db,
            today: local_today,
        }
    }

    /// Replace the clock used to date newly coded projects.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn time(&self) -> &H {
        &self.time
    }

    pub fn route_project(&self, project_id: &str) -> Result<Outcome> {
        let Some(project) = self.task.get_project(project_id)? else {
            tracing::warn!(%project_id, "Teamwork project does not exist, it may have been deleted");
            return Ok(Outcome::skipped(format!("project {project_id} not found")));
        };

        match name::parse(&project.name) {
            ParsedName::Unstructured => {
                tracing::debug!(%project_id, name = %project.name, "coding new project");
                self.create_project_flow(&project)
            }
            ParsedName::Structured(current) => {
                tracing::debug!(%project_id, name = %project.name, "checking coded project");
                self.update_project_flow(&project, current)
            }
        }
    }

    fn company_for(&self, project: &TaskProject) -> Result<Option<String>> {
        let Some(company) = self.task.get_company(&project.company_id)? else {
            tracing::warn!(
                project_id = %project.id,
                company_id = %project.company_id,
                "Teamwork company not found"
            );
            return Ok(None);
        };
        Ok(usable_abbreviation(&company))
    }

    pub fn create_project_flow(&self, project: &TaskProject) -> Result<Outcome> {
        let Some(abbr) = self.company_for(project)? else {
            return Ok(Outcome::skipped("no usable company abbreviation"));
        };

        let job_number = {
            let mut store = self.db.connect().inspect_err(|e| {
                tracing::error!(
                    project_id = %project.id,
                    severity = "critical",
                    error = %e,
                    "cannot open sequence store"
                );
            })?;
            store
                .allocate_or_get(&project.id, &abbr)
                .inspect_err(|e| {
                    tracing::error!(
                        project_id = %project.id,
                        client = %abbr,
                        severity = "critical",
                        error = %e,
                        "failed to allocate job number"
                    );
                })?
        };

        let code = ProjectCode::new(&name::yymm((self.today)()), &abbr, job_number)?;
        let new_name = CanonicalName::new(code.clone(), &project.name)?.to_string();
        tracing::info!(project_id = %project.id, from = %project.name, to = %new_name, "coding project");
        self.task.update_project(&new_name, &project.id)?;

        let Some(client) = self.time.get_client_by_name(&abbr)? else {
            tracing::error!(client = %abbr, "cannot create Harvest project: client does not exist");
            return Ok(Outcome::Coded {
                name: new_name,
                time_project_id: None,
            });
        };

        // The title may have been edited since the code was first issued.
        let prefix = format!("{code} ");
        if let Some(existing) = self.time.get_project_by_prefix(&prefix, None)? {
            tracing::error!(
                name = %new_name,
                existing = %existing.name,
                "Harvest project already exists under this code, leaving it untouched"
            );
            return Ok(Outcome::Coded {
                name: new_name,
                time_project_id: None,
            });
        }

        let id = self.time.create_project(&new_name, &client.id)?;
        Ok(Outcome::Coded {
            name: new_name,
            time_project_id: Some(id),
        })
    }

    pub fn update_project_flow(
        &self,
        project: &TaskProject,
        current: CanonicalName,
    ) -> Result<Outcome> {
        let Some(abbr) = self.company_for(project)? else {
            return Ok(Outcome::skipped("no usable company abbreviation"));
        };

        if current.client() == abbr {
            // Renaming again would fire another PROJECT.UPDATED, forever.
            tracing::debug!(name = %project.name, "project name already current");
            let roster = self.reconcile_roster(&project.name, &project.id)?;
            return Ok(Outcome::Unchanged {
                name: project.name.clone(),
                roster,
            });
        }

        let Some(client) = self.time.get_client_by_name(&abbr)? else {
            tracing::error!(
                client = %abbr,
                name = %project.name,
                "cannot rename project: Harvest client does not exist"
            );
            return Ok(Outcome::skipped(format!("Harvest client {abbr} not found")));
        };

        let renamed = CanonicalName::new(current.code.with_client(&abbr)?, &current.title)?;
        let new_name = renamed.to_string();
        tracing::info!(project_id = %project.id, from = %project.name, to = %new_name, "renaming project");
        self.task.update_project(&new_name, &project.id)?;

        let time_project_renamed = match self.time.get_project_by_name(&project.name)? {
            Some(time_project) => {
                self.time
                    .update_project(&time_project.id, &new_name, &client.id)?;
                true
            }
            None => {
                tracing::error!(
                    name = %project.name,
                    "cannot rename Harvest project: no project with that name"
                );
                false
            }
        };

        let roster = if time_project_renamed {
            self.reconcile_roster(&new_name, &project.id)?
        } else {
            None
        };

        Ok(Outcome::Renamed {
            from: project.name.clone(),
            to: new_name,
            time_project_renamed,
            roster,
        })
    }

    /// Make the Harvest project's assignments match the Teamwork project's
    /// people, matching on email. Returns `None` when no Harvest project has
    /// `time_project_name`.
    ///
    /// Individual add/remove failures are logged and counted; they do not
    /// stop the rest of the batch.
    pub fn reconcile_roster(
        &self,
        time_project_name: &str,
        task_project_id: &str,
    ) -> Result<Option<RosterReport>> {
        let task_roster: EmailRoster = self
            .task
            .get_project_people(task_project_id)?
            .into_iter()
            .map(|p| (p.id, p.email))
            .collect();

        let Some(time_project) = self.time.get_project_by_name(time_project_name)? else {
            tracing::error!(name = %time_project_name, "Harvest project does not exist");
            return Ok(None);
        };

        let mut time_roster = EmailRoster::new();
        for user_id in self.time.get_project_people(&time_project.id)? {
            match self.time.get_person(&user_id)? {
                Some(user) => time_roster.insert(user.id, &user.email),
                None => tracing::warn!(%user_id, "assigned Harvest user not found"),
            }
        }
        tracing::debug!(
            task = task_roster.len(),
            time = time_roster.len(),
            "comparing rosters"
        );

        let diff = roster::diff(&task_roster, &time_roster);
        let mut report = RosterReport::default();

        for user_id in diff.to_remove {
            match self.time.remove_user_assignment(&time_project.id, &user_id) {
                Ok(()) => report.removed.push(user_id),
                Err(e) => {
                    tracing::error!(%user_id, error = %e, "failed to remove Harvest assignment");
                    report.failures += 1;
                }
            }
        }

        for email in diff.to_add {
            let user = match self.time.get_person_by_email(&email) {
                Ok(Some(user)) => user,
                Ok(None) => {
                    tracing::warn!(%email, "no Harvest user with this email");
                    report.unknown_emails.push(email);
                    continue;
                }
                Err(e) => {
                    tracing::error!(%email, error = %e, "failed to look up Harvest user");
                    report.failures += 1;
                    continue;
                }
            };
            match self.time.add_user_assignment(&time_project.id, &user.id) {
                Ok(()) => report.added.push(user.id),
                Err(e) => {
                    tracing::error!(user_id = %user.id, error = %e, "failed to add Harvest assignment");
                    report.failures += 1;
                }
            }
        }

        Ok(Some(report))
    }

    fn company_abbreviation(&self, company_id: &str) -> Result<Option<String>> {
        let Some(company) = self.task.get_company(company_id)? else {
            tracing::warn!(%company_id, "Teamwork company not found");
            return Ok(None);
        };
        Ok(usable_abbreviation(&company))
    }

    pub fn create_counterpart_client(&self, company_id: &str) -> Result<Outcome> {
        let Some(abbr) = self.company_abbreviation(company_id)? else {
            return Ok(Outcome::skipped("no usable company abbreviation"));
        };
        self.time.create_client(&abbr)?;
        Ok(Outcome::ClientCreated { name: abbr })
    }

    pub fn ensure_counterpart_client(&self, company_id: &str) -> Result<Outcome> {
        let Some(abbr) = self.company_abbreviation(company_id)? else {
            return Ok(Outcome::skipped("no usable company abbreviation"));
        };
        if self.time.get_client_by_name(&abbr)?.is_some() {
            tracing::debug!(client = %abbr, "Harvest client already exists");
            return Ok(Outcome::ClientExists { name: abbr });
        }
        self.time.create_client(&abbr)?;
        Ok(Outcome::ClientCreated { name: abbr })
    }
}

/// The company's abbreviation, when it can serve as the client part of a code.
fn usable_abbreviation(company: &Company) -> Option<String> {
    match company.abbreviation() {
        None => {
            tracing::warn!(
                company = %company.name,
                "company abbreviation (address line one) is empty"
            );
            None
        }
        Some(abbr) if !name::is_client_abbreviation(abbr) => {
            tracing::warn!(
                company = %company.name,
                abbreviation = %abbr,
                "company abbreviation must be uppercase letters only"
            );
            None
        }
        Some(abbr) => Some(abbr.to_string()),
    }
}

impl<T: TaskTracker, H: TimeTracker> EventSink for Engine<T, H> {
    fn handle(&self, event: &WebhookEvent) -> Result<Outcome> {
        tracing::info!(event = %event.kind, object_id = %event.object_id, "handling event");
        match &event.kind {
            EventKind::ProjectCreated | EventKind::ProjectUpdated | EventKind::ProjectCopied => {
                self.route_project(&event.object_id)
            }
            EventKind::CompanyCreated => self.create_counterpart_client(&event.object_id),
            EventKind::CompanyUpdated => self.ensure_counterpart_client(&event.object_id),
            EventKind::Other(kind) => {
                tracing::debug!(%kind, "ignoring event");
                Ok(Outcome::skipped(format!("unhandled event {kind}")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
