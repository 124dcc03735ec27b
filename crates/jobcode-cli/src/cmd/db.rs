use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use jobcode_core::config::Config;
use jobcode_core::import::import_projects;
use jobcode_core::sequence::SequenceStore;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum DbSubcommand {
    /// Create the job number table and seed it from Teamwork
    Setup {
        /// Drop and rebuild an existing table
        #[arg(long)]
        recreate: bool,
        /// Create the table without importing existing project codes
        #[arg(long)]
        no_import: bool,
    },

    /// Drop the job number table and every record in it
    Drop,

    /// List allocated job numbers
    List,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, subcmd: DbSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load_with_env(config_path).context("failed to load config")?;
    let db_path = config.database.path.clone();
    let store = SequenceStore::open(&db_path)
        .with_context(|| format!("cannot open {}", db_path.display()))?;

    match subcmd {
        DbSubcommand::Setup {
            recreate,
            no_import,
        } => setup(&config, &store, recreate, no_import, json),
        DbSubcommand::Drop => {
            store.drop_all()?;
            if json {
                print_json(&serde_json::json!({ "dropped": true }))?;
            } else {
                println!("Dropped job number table in {}", db_path.display());
            }
            Ok(())
        }
        DbSubcommand::List => list(&store, json),
    }
}

// ---------------------------------------------------------------------------
// setup
// ---------------------------------------------------------------------------

fn setup(
    config: &Config,
    store: &SequenceStore,
    recreate: bool,
    no_import: bool,
    json: bool,
) -> anyhow::Result<()> {
    store.create_table(recreate)?;

    if no_import {
        if json {
            print_json(&serde_json::json!({ "created": true, "import": null }))?;
        } else {
            println!("Created job number table.");
        }
        return Ok(());
    }

    let teamwork = config.teamwork_client()?;
    let report = import_projects(&teamwork, store).context("project import failed")?;

    if json {
        print_json(&serde_json::json!({ "created": true, "import": report }))?;
    } else {
        println!(
            "Created job number table. Imported {} of {} projects ({} skipped).",
            report.imported, report.scanned, report.skipped
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(store: &SequenceStore, json: bool) -> anyhow::Result<()> {
    if !store.table_exists()? {
        anyhow::bail!("job number table does not exist; run `jobcode db setup` first");
    }
    let records = store.list()?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No job numbers allocated.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.client_abbreviation.clone(),
                r.job_number.to_string(),
                r.external_project_id.clone(),
            ]
        })
        .collect();
    print_table(&["CLIENT", "JOB", "PROJECT"], rows);
    Ok(())
}
