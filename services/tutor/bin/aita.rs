//! Main Entrypoint for the Terminal Tutor
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command line.
//! 2. Initializing logging (to stderr, so stdout stays the transcript).
//! 3. Loading the activity catalog.
//! 4. Running one session against stdin, or listing the catalog.

use aita_core::{Catalog, InMemoryCatalog, Session};
use aita_tutor::{config::Config, console::run_conversation, event_log::JsonlEventLog};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Parser)]
#[command(name = "aita", version, about = "Walk a learner through a tutoring activity")]
struct Cli {
    /// Catalog JSON file (overrides AITA_CATALOG_PATH).
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Interaction event log (overrides AITA_EVENT_LOG).
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the activities in the catalog
    List,
    /// Run an activity interactively
    Run {
        #[arg(long)]
        learner: String,
        #[arg(long)]
        activity: String,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<InMemoryCatalog> {
    match path {
        Some(path) => InMemoryCatalog::from_path(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => InMemoryCatalog::builtin().context("Bundled catalog is invalid"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }
    if let Some(events) = cli.events {
        config.event_log_path = events;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Load Catalog ---
    let catalog = load_catalog(config.catalog_path.as_ref())?;

    match cli.command {
        Command::List => {
            for activity in catalog.activities() {
                println!(
                    "{}\t{}\t{} part(s)",
                    activity.key,
                    activity.name,
                    activity.sub_tasks.len()
                );
            }
        }
        Command::Run { learner, activity } => {
            info!(
                learner = %learner,
                activity = %activity,
                event_log = %config.event_log_path.display(),
                "Starting tutoring session"
            );
            let catalog: Arc<dyn Catalog> = Arc::new(catalog);
            let mut session = Session::new(catalog, Arc::new(config.envelope()));
            let mut log = JsonlEventLog::new(config.event_log_path.clone());

            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let summary = run_conversation(
                &mut session,
                &learner,
                &activity,
                stdin.lock(),
                &mut stdout,
                &mut log,
            )?;

            if summary.events_dropped > 0 {
                eprintln!(
                    "warning: {} interaction event(s) could not be written to {}",
                    summary.events_dropped,
                    log.path().display()
                );
            }
        }
    }

    Ok(())
}
