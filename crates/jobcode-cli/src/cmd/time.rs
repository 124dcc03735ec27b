use crate::output::print_json;
use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use jobcode_core::config::Config;
use jobcode_core::timesync::{sync_time_entries, DEFAULT_PACING};
use std::path::Path;

#[derive(Subcommand)]
pub enum TimeSubcommand {
    /// Copy one day's Harvest entries onto the matching Teamwork projects
    Sync {
        /// Day to copy (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(config_path: &Path, subcmd: TimeSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TimeSubcommand::Sync { date } => sync(config_path, date, json),
    }
}

fn sync(config_path: &Path, date: Option<NaiveDate>, json: bool) -> anyhow::Result<()> {
    let config = Config::load_with_env(config_path).context("failed to load config")?;
    let teamwork = config.teamwork_client()?;
    let harvest = config.harvest_client()?;
    let day = date.unwrap_or_else(|| Local::now().date_naive());

    let report = sync_time_entries(&teamwork, &harvest, day, DEFAULT_PACING)?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "{day}: {} entries across {} projects, {} copied, {} skipped.",
            report.entries, report.projects, report.copied, report.skipped
        );
    }
    Ok(())
}
