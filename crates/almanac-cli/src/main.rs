//! Almanac CLI
//!
//! Browse and edit a calendar seeded for the current month. Every command
//! runs against a fresh in-memory store through the same loader, cache and
//! mutation coordinator a UI would use, so the simulated latency of the
//! chosen backend is observable from the log output.

use almanac_core::AlmanacConfig;
use almanac_store::Backend;
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{CreateArgs, EditArgs};

#[derive(Parser)]
#[command(name = "almanac")]
#[command(about = "Almanac - calendar activities with optimistic updates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Service boundary to run against (rest or graphql)
    #[arg(short, long, global = true, default_value = "rest")]
    backend: Backend,

    /// Seed the calendar for the month of this date instead of today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every activity
    List,

    /// Show one activity
    Show {
        /// Activity id as it appears in a route
        id: String,
    },

    /// List activities starting between two days (inclusive)
    Range {
        /// First day, YYYY-MM-DD
        from: NaiveDate,
        /// Last day, YYYY-MM-DD
        to: NaiveDate,
    },

    /// Edit an activity; unspecified fields keep their current values
    Edit(EditArgs),

    /// Create an activity
    Create(CreateArgs),

    /// Delete an activity
    Delete {
        /// Activity id as it appears in a route
        id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AlmanacConfig::load(cli.config.as_deref())?;

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let today = cli
        .today
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let app = commands::build_app(cli.backend, &config, today)?;

    match cli.command {
        Commands::List => commands::list(&app).await?,
        Commands::Show { id } => commands::show(&app, &id).await?,
        Commands::Range { from, to } => commands::range(&app, from, to).await?,
        Commands::Edit(args) => commands::edit(&app, args).await?,
        Commands::Create(args) => commands::create(&app, args).await?,
        Commands::Delete { id } => commands::delete(&app, &id).await?,
    }

    Ok(())
}
