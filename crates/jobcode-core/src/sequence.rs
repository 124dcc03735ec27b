//! Per-client job number allocation backed by SQLite.
//!
//! # Table design
//!
//! ```text
//! project_code(external_project_id TEXT PK, client_abbreviation TEXT, job_number INTEGER)
//! UNIQUE (client_abbreviation, job_number)
//! ```
//!
//! One row per task-tracking project. The next number for a client is
//! `max(job_number) + 1` over that client's rows, starting at 100. The
//! unique constraint is the only guard against two writers picking the same
//! number; an allocation that trips it rolls back and re-reads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::{JobcodeError, Result};

/// First job number handed out for a client with no rows.
pub const FIRST_JOB_NUMBER: u32 = 100;

const MAX_ATTEMPTS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS project_code (
        external_project_id TEXT PRIMARY KEY NOT NULL,
        client_abbreviation TEXT NOT NULL,
        job_number INTEGER NOT NULL CHECK (job_number > 0),
        CONSTRAINT project_code_uk UNIQUE (client_abbreviation, job_number)
    );
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCodeRecord {
    pub external_project_id: String,
    pub client_abbreviation: String,
    pub job_number: u32,
}

// ---------------------------------------------------------------------------
// SequenceDb
// ---------------------------------------------------------------------------

/// Location of the sequence database. Cheap to clone; each call to
/// [`SequenceDb::connect`] opens a fresh connection that is closed when the
/// returned store is dropped.
#[derive(Debug, Clone)]
pub struct SequenceDb {
    path: PathBuf,
}

impl SequenceDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection and make sure the table exists.
    pub fn connect(&self) -> Result<SequenceStore> {
        let store = SequenceStore::open(&self.path)?;
        store.ensure_table()?;
        Ok(store)
    }
}

// ---------------------------------------------------------------------------
// SequenceStore
// ---------------------------------------------------------------------------

pub struct SequenceStore {
    conn: Connection,
}

enum Attempt {
    Done(u32),
    Conflict,
}

impl SequenceStore {
    /// Open the database file without touching the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.ensure_table()?;
        Ok(store)
    }

    pub fn ensure_table(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_TABLE)?;
        Ok(())
    }

    pub fn table_exists(&self) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'project_code'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create the table. An existing table is an error unless `recreate`
    /// is set, in which case it is dropped first.
    pub fn create_table(&self, recreate: bool) -> Result<()> {
        if self.table_exists()? {
            if !recreate {
                return Err(JobcodeError::TableExists);
            }
            self.drop_all()?;
        }
        self.ensure_table()
    }

    /// Drop the table and every record in it.
    pub fn drop_all(&self) -> Result<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS project_code;")?;
        tracing::warn!("dropped project_code table");
        Ok(())
    }

    pub fn get(&self, external_project_id: &str) -> Result<Option<ProjectCodeRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT external_project_id, client_abbreviation, job_number
                 FROM project_code WHERE external_project_id = ?1",
                params![external_project_id],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Return the job number stored for `external_project_id`, allocating
    /// the next one for `client` if the project has none yet.
    ///
    /// The client abbreviation is fixed at first allocation. Calling again
    /// with a different abbreviation returns the stored number untouched.
    pub fn allocate_or_get(&mut self, external_project_id: &str, client: &str) -> Result<u32> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_allocate(external_project_id, client)? {
                Attempt::Done(n) => return Ok(n),
                Attempt::Conflict => {
                    tracing::debug!(
                        project_id = %external_project_id,
                        client = %client,
                        attempt,
                        "job number taken, retrying"
                    );
                }
            }
        }
        Err(JobcodeError::SequenceConflict {
            client: client.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    fn try_allocate(&mut self, external_project_id: &str, client: &str) -> Result<Attempt> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(String, u32)> = tx
            .query_row(
                "SELECT client_abbreviation, job_number
                 FROM project_code WHERE external_project_id = ?1",
                params![external_project_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((stored_client, job_number)) = existing {
            if stored_client != client {
                tracing::debug!(
                    project_id = %external_project_id,
                    stored = %stored_client,
                    requested = %client,
                    "keeping stored client abbreviation"
                );
            }
            tx.commit()?;
            return Ok(Attempt::Done(job_number));
        }

        let next: u32 = tx.query_row(
            "SELECT COALESCE(MAX(job_number), ?2) + 1
             FROM project_code WHERE client_abbreviation = ?1",
            params![client, FIRST_JOB_NUMBER - 1],
            |row| row.get(0),
        )?;

        match tx.execute(
            "INSERT INTO project_code (external_project_id, client_abbreviation, job_number)
             VALUES (?1, ?2, ?3)",
            params![external_project_id, client, next],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Ok(Attempt::Conflict),
            Err(e) => return Err(e.into()),
        }
        tx.commit()?;

        tracing::info!(
            project_id = %external_project_id,
            client = %client,
            job_number = next,
            "allocated job number"
        );
        Ok(Attempt::Done(next))
    }

    /// Insert a record as-is. Used when seeding from existing project names.
    pub fn insert(&self, record: &ProjectCodeRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO project_code (external_project_id, client_abbreviation, job_number)
             VALUES (?1, ?2, ?3)",
            params![
                record.external_project_id,
                record.client_abbreviation,
                record.job_number
            ],
        )?;
        Ok(())
    }

    /// All records, ordered by client then job number.
    pub fn list(&self) -> Result<Vec<ProjectCodeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT external_project_id, client_abbreviation, job_number
             FROM project_code ORDER BY client_abbreviation, job_number",
        )?;
        let rows = stmt.query_map([], map_record)?;
        let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM project_code", [], |row| row.get(0))?;
        usize::try_from(n).map_err(|_| JobcodeError::Sequence(format!("invalid row count {n}")))
    }
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectCodeRecord> {
    Ok(ProjectCodeRecord {
        external_project_id: row.get(0)?,
        client_abbreviation: row.get(1)?,
        job_number: row.get(2)?,
    })
}

pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, client: &str, job_number: u32) -> ProjectCodeRecord {
        ProjectCodeRecord {
            external_project_id: id.into(),
            client_abbreviation: client.into(),
            job_number,
        }
    }

    #[test]
    fn first_allocation_is_100() {
        let mut store = SequenceStore::open_in_memory().unwrap();
        assert_eq!(store.allocate_or_get("tw-1", "ACM").unwrap(), 100);
        assert_eq!(store.get("tw-1").unwrap(), Some(record("tw-1", "ACM", 100)));
    }

    #[test]
    fn allocation_is_idempotent_per_project() {
        let mut store = SequenceStore::open_in_memory().unwrap();
        let first = store.allocate_or_get("tw-1", "ACM").unwrap();
        let second = store.allocate_or_get("tw-1", "ACM").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn sequences_are_scoped_per_client() {
        let mut store = SequenceStore::open_in_memory().unwrap();
        store.insert(&record("a", "ACM", 100)).unwrap();
        store.insert(&record("b", "ACM", 101)).unwrap();

        assert_eq!(store.allocate_or_get("c", "ACM").unwrap(), 102);
        assert_eq!(store.allocate_or_get("d", "ZED").unwrap(), 100);
    }

    #[test]
    fn next_number_follows_the_maximum_not_the_count() {
        let mut store = SequenceStore::open_in_memory().unwrap();
        store.insert(&record("a", "ACM", 250)).unwrap();
        assert_eq!(store.allocate_or_get("b", "ACM").unwrap(), 251);
    }

    #[test]
    fn stored_client_is_never_rewritten() {
        let mut store = SequenceStore::open_in_memory().unwrap();
        assert_eq!(store.allocate_or_get("tw-1", "ACM").unwrap(), 100);
        store.insert(&record("tw-2", "ACME", 100)).unwrap();

        // Same project, different abbreviation: stored code wins.
        assert_eq!(store.allocate_or_get("tw-1", "ACME").unwrap(), 100);
        assert_eq!(store.get("tw-1").unwrap(), Some(record("tw-1", "ACM", 100)));
        assert_eq!(store.allocate_or_get("tw-3", "ACME").unwrap(), 101);
    }

    #[test]
    fn insert_rejects_duplicate_client_job_pair() {
        let store = SequenceStore::open_in_memory().unwrap();
        store.insert(&record("a", "ACM", 100)).unwrap();
        let err = store.insert(&record("b", "ACM", 100)).unwrap_err();
        assert!(matches!(err, JobcodeError::Sequence(_)));
    }

    #[test]
    fn create_table_refuses_existing_without_recreate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codes.db");
        let store = SequenceStore::open(&path).unwrap();
        assert!(!store.table_exists().unwrap());
        store.create_table(false).unwrap();
        store.insert(&record("a", "ACM", 100)).unwrap();

        assert!(matches!(
            store.create_table(false),
            Err(JobcodeError::TableExists)
        ));
        store.create_table(true).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn drop_all_removes_table() {
        let store = SequenceStore::open_in_memory().unwrap();
        store.insert(&record("a", "ACM", 100)).unwrap();
        store.drop_all().unwrap();
        assert!(!store.table_exists().unwrap());
    }

    #[test]
    fn list_orders_by_client_then_job() {
        let store = SequenceStore::open_in_memory().unwrap();
        store.insert(&record("z", "ZED", 100)).unwrap();
        store.insert(&record("b", "ACM", 101)).unwrap();
        store.insert(&record("a", "ACM", 100)).unwrap();
        let ids: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.external_project_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "z"]);
    }

    #[test]
    fn connections_from_the_same_handle_share_state() {
        let dir = TempDir::new().unwrap();
        let db = SequenceDb::new(dir.path().join("codes.db"));
        {
            let mut store = db.connect().unwrap();
            assert_eq!(store.allocate_or_get("tw-1", "ACM").unwrap(), 100);
        }
        let mut store = db.connect().unwrap();
        assert_eq!(store.allocate_or_get("tw-1", "ACM").unwrap(), 100);
        assert_eq!(store.allocate_or_get("tw-2", "ACM").unwrap(), 101);
    }

    #[test]
    fn persistent_conflict_gives_up_after_bounded_retries() {
        let mut store = SequenceStore::open_in_memory().unwrap();
        // Every insert fails as if another writer had just taken the number.
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER project_code_taken BEFORE INSERT ON project_code
                 BEGIN SELECT RAISE(ABORT, 'job number taken'); END;",
            )
            .unwrap();

        let err = store.allocate_or_get("tw-1", "ACM").unwrap_err();
        assert!(matches!(
            err,
            JobcodeError::SequenceConflict { ref client, attempts } if client == "ACM" && attempts == MAX_ATTEMPTS
        ));
        assert_eq!(store.count().unwrap(), 0);

        store
            .conn
            .execute_batch("DROP TRIGGER project_code_taken;")
            .unwrap();
        assert_eq!(store.allocate_or_get("tw-1", "ACM").unwrap(), 100);
    }

    #[test]
    fn concurrent_allocations_never_share_a_number() {
        let dir = TempDir::new().unwrap();
        let db = SequenceDb::new(dir.path().join("codes.db"));
        db.connect().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let mut store = db.connect().unwrap();
                    store.allocate_or_get(&format!("tw-{i}"), "ACM").unwrap()
                })
            })
            .collect();

        let mut numbers: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, (100..108).collect::<Vec<_>>());
    }
}
