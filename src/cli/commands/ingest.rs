//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(path: &str, force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pugg doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Extracting, chunking, and indexing...");

    match orchestrator.ingest_document(Path::new(path), force).await {
        Ok(result) if result.skipped => {
            spinner.finish_and_clear();
            Output::info(&format!(
                "'{}' is already indexed. Use --force to re-process.",
                result.title
            ));
        }
        Ok(result) => {
            spinner.finish_and_clear();
            Output::success(&format!(
                "Indexed '{}' ({} chunks)",
                result.title, result.chunks_indexed
            ));
            Output::kv("Document ID", &result.document_id);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
