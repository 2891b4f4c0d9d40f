//! Forget command - remove a document from the knowledge base.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the forget command.
pub async fn run_forget(document_id: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.forget_document(document_id).await {
        Ok(deleted) => {
            Output::success(&format!(
                "Removed '{}' ({} chunks deleted)",
                document_id, deleted
            ));
        }
        Err(e) => {
            Output::error(&format!("Failed to remove '{}': {}", document_id, e));
            return Err(e.into());
        }
    }

    Ok(())
}
