//! Rechunk command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the rechunk command.
pub async fn run_rechunk(document_id: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pugg doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let targets: Vec<String> = if document_id == "all" {
        orchestrator
            .sqlite_store()
            .list_sources()?
            .into_iter()
            .map(|(id, _, _)| id)
            .collect()
    } else {
        vec![document_id.to_string()]
    };

    if targets.is_empty() {
        Output::info("No stored documents available for rechunking.");
        return Ok(());
    }

    for target in targets {
        let spinner = Output::spinner(&format!("Rechunking '{}'...", target));

        match orchestrator.rechunk_document(&target).await {
            Ok(result) => {
                spinner.finish_and_clear();
                Output::success(&format!(
                    "Rechunked '{}' ({} chunks)",
                    result.title, result.chunks_indexed
                ));
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Failed to rechunk '{}': {}", target, e));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
