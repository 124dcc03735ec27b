use crate::output::print_json;
use chrono::Local;
use clap::Subcommand;
use jobcode_core::name::{self, ParsedName};

#[derive(Subcommand)]
pub enum NameSubcommand {
    /// Split a project name into date, client, job number and title
    Parse {
        name: String,
    },

    /// Build a canonical project name
    Format {
        /// Client abbreviation (uppercase letters)
        #[arg(long)]
        client: String,
        /// Job number
        #[arg(long)]
        job: u32,
        /// YYMM date part (default: current month)
        #[arg(long)]
        date: Option<String>,
        /// Project title
        title: String,
    },
}

pub fn run(subcmd: NameSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        NameSubcommand::Parse { name } => parse(&name, json),
        NameSubcommand::Format {
            client,
            job,
            date,
            title,
        } => {
            let formatted = name::format(
                date.as_deref(),
                &client,
                job,
                &title,
                Local::now().date_naive(),
            )?;
            if json {
                print_json(&serde_json::json!({ "name": formatted }))
            } else {
                println!("{formatted}");
                Ok(())
            }
        }
    }
}

fn parse(raw: &str, json: bool) -> anyhow::Result<()> {
    match name::parse(raw) {
        ParsedName::Structured(canonical) => {
            if json {
                print_json(&serde_json::json!({
                    "structured": true,
                    "date": canonical.code.date,
                    "client": canonical.client(),
                    "job_number": canonical.job_number(),
                    "title": canonical.title,
                }))?;
            } else {
                println!("date:       {}", canonical.code.date);
                println!("client:     {}", canonical.client());
                println!("job number: {}", canonical.job_number());
                println!("title:      {}", canonical.title);
            }
        }
        ParsedName::Unstructured => {
            if json {
                print_json(&serde_json::json!({ "structured": false }))?;
            } else {
                println!("unstructured");
            }
        }
    }
    Ok(())
}
