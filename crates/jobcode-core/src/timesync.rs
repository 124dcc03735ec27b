//! Copy a day's logged hours from the time tracker onto the task tracker.
//!
//! Projects are matched by identical name and people by email. Hours logged
//! by someone who is not on the task-side project are left behind.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::gateway::{TaskTracker, TimeTracker};
use crate::roster::EmailRoster;
use crate::types::{NewTaskTimeEntry, TimeEntry, TimeProject};

/// Delay between posted entries in production runs.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSyncReport {
    pub projects: usize,
    pub entries: usize,
    pub copied: usize,
    pub skipped: usize,
}

pub fn sync_time_entries(
    task: &dyn TaskTracker,
    time: &dyn TimeTracker,
    day: NaiveDate,
    pacing: Duration,
) -> Result<TimeSyncReport> {
    let projects = time.get_projects_updated_since(day)?;
    tracing::info!(%day, projects = projects.len(), "syncing time entries");

    let mut report = TimeSyncReport::default();
    for project in projects {
        report.projects += 1;
        if let Err(e) = sync_project(task, time, &project, day, pacing, &mut report) {
            tracing::error!(project = %project.name, error = %e, "time sync failed for project");
        }
    }

    tracing::info!(
        projects = report.projects,
        entries = report.entries,
        copied = report.copied,
        skipped = report.skipped,
        "time sync finished"
    );
    Ok(report)
}

fn sync_project(
    task: &dyn TaskTracker,
    time: &dyn TimeTracker,
    project: &TimeProject,
    day: NaiveDate,
    pacing: Duration,
    report: &mut TimeSyncReport,
) -> Result<()> {
    let entries = time.get_project_entries(&project.id, day, day)?;
    if entries.is_empty() {
        return Ok(());
    }
    report.entries += entries.len();

    let Some(task_project) = task.get_project_by_name(&project.name)? else {
        tracing::warn!(project = %project.name, "no Teamwork project with this name");
        report.skipped += entries.len();
        return Ok(());
    };
    let roster: EmailRoster = task
        .get_project_people(&task_project.id)?
        .into_iter()
        .map(|p| (p.id, p.email))
        .collect();

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            thread::sleep(pacing);
        }
        match copy_entry(task, time, &task_project.id, &roster, entry) {
            Ok(true) => report.copied += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                tracing::error!(entry_id = %entry.id, error = %e, "failed to copy time entry");
                report.skipped += 1;
            }
        }
    }
    Ok(())
}

fn copy_entry(
    task: &dyn TaskTracker,
    time: &dyn TimeTracker,
    task_project_id: &str,
    roster: &EmailRoster,
    entry: &TimeEntry,
) -> Result<bool> {
    let Some(user) = time.get_person(&entry.user_id)? else {
        tracing::warn!(user_id = %entry.user_id, "Harvest user not found");
        return Ok(false);
    };
    let Some(person_id) = roster.ids_for(&user.email).next() else {
        tracing::debug!(email = %user.email, "user is not on the Teamwork project");
        return Ok(false);
    };
    task.add_time_entry(
        task_project_id,
        &NewTaskTimeEntry {
            person_id: person_id.to_string(),
            date: entry.spent_at,
            hours: entry.hours,
            description: entry.notes.clone(),
            billable: true,
        },
    )?;
    Ok(true)
}
