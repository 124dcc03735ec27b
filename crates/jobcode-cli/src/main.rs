mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, db::DbSubcommand, name::NameSubcommand, time::TimeSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "jobcode",
    about = "Keep Teamwork project codes and Harvest projects in step",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file
    #[arg(
        long,
        global = true,
        env = "JOBCODE_CONFIG",
        default_value = jobcode_core::config::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook receiver
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Administer the job number table
    Db {
        #[command(subcommand)]
        subcommand: DbSubcommand,
    },

    /// Copy logged hours from Harvest to Teamwork
    Time {
        #[command(subcommand)]
        subcommand: TimeSubcommand,
    },

    /// Parse or build canonical project names
    Name {
        #[command(subcommand)]
        subcommand: NameSubcommand,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve { bind } => cmd::serve::run(&cli.config, bind.as_deref()),
        Commands::Db { subcommand } => cmd::db::run(&cli.config, subcommand, cli.json),
        Commands::Time { subcommand } => cmd::time::run(&cli.config, subcommand, cli.json),
        Commands::Name { subcommand } => cmd::name::run(subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
