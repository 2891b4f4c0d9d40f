//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.vector_store().list_documents().await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info("No documents indexed yet. Use 'pugg ingest <path>' to add material.");
            } else {
                Output::header(&format!("Indexed Documents ({})", documents.len()));
                println!();

                for doc in &documents {
                    Output::document_info(&doc.title, &doc.document_id, doc.chunk_count, doc.total_chars);
                }

                let total_chunks: u32 = documents.iter().map(|d| d.chunk_count).sum();
                println!();
                Output::kv("Total documents", &documents.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
