//! Pugg CLI entry point.

use anyhow::Result;
use clap::Parser;
use pugg::cli::{commands, Cli, Commands};
use pugg::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pugg={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Ingest { path, force } => {
            commands::run_ingest(path, *force, settings).await?;
        }

        Commands::Ask {
            question,
            model,
            thinking,
        } => {
            commands::run_ask(question, model.clone(), *thinking, settings).await?;
        }

        Commands::Chat { model, thinking } => {
            commands::run_chat(model.clone(), *thinking, settings).await?;
        }

        Commands::Search {
            query,
            limit,
            min_score,
        } => {
            commands::run_search(query, *limit, *min_score, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Stats => {
            commands::run_stats(settings)?;
        }

        Commands::Rechunk { document_id } => {
            commands::run_rechunk(document_id, settings).await?;
        }

        Commands::Forget { document_id } => {
            commands::run_forget(document_id, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
