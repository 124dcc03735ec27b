//! Seed the sequence store from project names that already carry a code.

use serde::Serialize;

use crate::error::Result;
use crate::gateway::TaskTracker;
use crate::name::{self, ParsedName};
use crate::sequence::{ProjectCodeRecord, SequenceStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub scanned: usize,
    pub imported: usize,
    pub skipped: usize,
}

/// Record every coded task-tracking project in `store`.
///
/// Projects with unstructured names are counted as scanned and ignored.
/// A row the store refuses (the id or the client/job pair is already
/// present) is logged and skipped.
pub fn import_projects(task: &dyn TaskTracker, store: &SequenceStore) -> Result<ImportReport> {
    let projects = task.get_projects().inspect_err(|e| {
        tracing::error!(error = %e, "could not retrieve projects from Teamwork");
    })?;

    let mut report = ImportReport::default();
    for project in projects {
        report.scanned += 1;
        let ParsedName::Structured(canonical) = name::parse(&project.name) else {
            continue;
        };
        let record = ProjectCodeRecord {
            external_project_id: project.id.clone(),
            client_abbreviation: canonical.client().to_string(),
            job_number: canonical.job_number(),
        };
        match store.insert(&record) {
            Ok(()) => {
                tracing::debug!(
                    project_id = %record.external_project_id,
                    client = %record.client_abbreviation,
                    job_number = record.job_number,
                    "imported project code"
                );
                report.imported += 1;
            }
            Err(e) => {
                tracing::error!(
                    project_id = %project.id,
                    name = %project.name,
                    error = %e,
                    "failed to record project code"
                );
                report.skipped += 1;
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        imported = report.imported,
        skipped = report.skipped,
        "project import finished"
    );
    Ok(report)
}
