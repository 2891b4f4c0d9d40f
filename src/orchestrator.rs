//! Pipeline orchestrator for Pugg.
//!
//! Wires configuration into the ingestion pipeline (extract, chunk, embed,
//! index) and the agent components (planner, dispatcher, session).

use crate::agent::{Dispatcher, Planner, ToolRegistry};
use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PuggError, Result};
use crate::ingest;
use crate::llm::{CompletionOptions, LlmClient, OpenAiLlm};
use crate::memory::SessionContext;
use crate::retrieval::{Retriever, VectorRetriever};
use crate::vector_store::{SqliteVectorStore, StoredChunk, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the Pugg pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<SqliteVectorStore>,
}

impl Orchestrator {
    /// Create a new orchestrator with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let llm: Arc<dyn LlmClient> = Arc::new(
            OpenAiLlm::new(&prompts.identity.system)
                .with_fallback_model(settings.llm.fallback_model.clone()),
        );

        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let vector_store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        Ok(Self {
            settings,
            prompts,
            llm,
            embedder,
            vector_store,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<SqliteVectorStore>,
    ) -> Self {
        Self {
            settings,
            prompts,
            llm,
            embedder,
            vector_store,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the vector store (as trait object).
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone() as Arc<dyn VectorStore>
    }

    /// Get a reference to the SQLite store (for sources and session history).
    pub fn sqlite_store(&self) -> Arc<SqliteVectorStore> {
        self.vector_store.clone()
    }

    /// Build a retriever over the vector store.
    pub fn retriever(&self) -> Arc<dyn Retriever> {
        Arc::new(
            VectorRetriever::new(self.vector_store(), self.embedder.clone())
                .with_min_score(self.settings.retrieval.min_score),
        )
    }

    /// Build the request planner.
    pub fn planner(&self) -> Planner {
        Planner::new()
    }

    /// Build a dispatcher with the configured tool registry.
    pub fn dispatcher(&self) -> Dispatcher {
        let options = CompletionOptions::from_settings(&self.settings.llm);

        let registry = ToolRegistry::new(
            self.llm.clone(),
            self.retriever(),
            self.prompts.clone(),
            options.clone(),
        );

        Dispatcher::new(registry, self.llm.clone(), self.prompts.clone(), options)
            .with_top_k(self.settings.retrieval.top_k, self.settings.retrieval.max_top_k)
    }

    /// Start a new session context.
    pub fn session(&self) -> SessionContext {
        SessionContext::with_capacity(self.settings.agent.short_term_turns)
    }

    /// Persist a completed session to the long-term log.
    pub fn end_session(&self, session: &SessionContext) -> Result<()> {
        if session.stats.interaction_count == 0 {
            return Ok(());
        }
        self.vector_store.save_session(&session.to_record())
    }

    /// Whether any documents are indexed.
    pub async fn has_documents(&self) -> Result<bool> {
        Ok(self.vector_store.chunk_count().await? > 0)
    }

    /// Ingest a document: extract text, chunk, embed, and index.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_document(&self, path: &Path, force: bool) -> Result<IngestResult> {
        let document = ingest::extract(path)?;

        let min_chars = self.settings.chunking.min_document_chars;
        if document.text.trim().len() < min_chars {
            return Err(PuggError::Ingest(format!(
                "Extracted text too short to index ({} chars, minimum {})",
                document.text.trim().len(),
                min_chars
            )));
        }

        if !force && self.vector_store.is_document_indexed(&document.id).await? {
            info!("Document {} is already indexed, skipping", document.id);
            return Ok(IngestResult {
                document_id: document.id,
                title: document.title,
                chunks_indexed: 0,
                skipped: true,
            });
        }

        // Keep the raw text so the document can be re-chunked later
        self.vector_store
            .store_source(&document.id, &document.title, &document.text)?;

        let indexed = self
            .index_text(&document.id, &document.title, &document.text)
            .await?;

        Ok(IngestResult {
            document_id: document.id,
            title: document.title,
            chunks_indexed: indexed,
            skipped: false,
        })
    }

    /// Re-chunk an ingested document from its stored text without
    /// re-extracting, picking up current chunking settings.
    #[instrument(skip(self))]
    pub async fn rechunk_document(&self, document_id: &str) -> Result<IngestResult> {
        let (title, text) = self
            .vector_store
            .get_source(document_id)?
            .ok_or_else(|| PuggError::DocumentNotFound(document_id.to_string()))?;

        info!("Rechunking '{}' from stored text", title);

        let indexed = self.index_text(document_id, &title, &text).await?;

        Ok(IngestResult {
            document_id: document_id.to_string(),
            title,
            chunks_indexed: indexed,
            skipped: false,
        })
    }

    /// Remove a document's chunks and stored text.
    pub async fn forget_document(&self, document_id: &str) -> Result<usize> {
        let deleted = self.vector_store.delete_by_document(document_id).await?;
        let had_source = self.vector_store.delete_source(document_id)?;

        if deleted == 0 && !had_source {
            return Err(PuggError::DocumentNotFound(document_id.to_string()));
        }
        Ok(deleted)
    }

    /// Chunk, embed, and index text, replacing any existing chunks.
    async fn index_text(&self, document_id: &str, title: &str, text: &str) -> Result<usize> {
        let splitter = TextSplitter::new(ChunkingConfig {
            chunk_size: self.settings.chunking.chunk_size,
            chunk_overlap: self.settings.chunking.chunk_overlap,
        });

        let chunks = splitter.split(text);
        if chunks.is_empty() {
            return Err(PuggError::Ingest(
                "No chunks produced from document text".to_string(),
            ));
        }

        info!("Split '{}' into {} chunks", title, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let stored: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                StoredChunk::new(
                    document_id.to_string(),
                    title.to_string(),
                    chunk.content,
                    embedding,
                    chunk.order,
                )
            })
            .collect();

        self.vector_store.delete_by_document(document_id).await?;
        let count = self.vector_store.upsert_batch(&stored).await?;

        Ok(count)
    }
}

/// Result of ingesting a document.
#[derive(Debug)]
pub struct IngestResult {
    /// Document ID.
    pub document_id: String,
    /// Title.
    pub title: String,
    /// Number of chunks indexed.
    pub chunks_indexed: usize,
    /// Whether ingestion was skipped (already indexed).
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullLlm;

    #[async_trait]
    impl LlmClient for NullLlm {
        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            Ok("ok".to_string())
        }
    }

    struct CountingEmbedder;

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(NullLlm),
            Arc::new(CountingEmbedder),
            Arc::new(SqliteVectorStore::in_memory().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_ingest_roundtrip_and_rechunk() {
        use std::io::Write;

        let orch = orchestrator();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biology notes.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", "Mitosis is cell division. ".repeat(20)).unwrap();

        let result = orch.ingest_document(&path, false).await.unwrap();
        assert_eq!(result.document_id, "biology-notes");
        assert!(!result.skipped);
        assert!(result.chunks_indexed >= 1);

        // Second ingest without force is skipped
        let again = orch.ingest_document(&path, false).await.unwrap();
        assert!(again.skipped);

        // Rechunk works from the stored source text
        let rechunked = orch.rechunk_document("biology-notes").await.unwrap();
        assert_eq!(rechunked.chunks_indexed, result.chunks_indexed);

        assert!(orch.has_documents().await.unwrap());
        assert!(orch.forget_document("biology-notes").await.unwrap() >= 1);
        assert!(!orch.has_documents().await.unwrap());
    }

    #[tokio::test]
    async fn test_ingest_rejects_short_documents() {
        use std::io::Write;

        let orch = orchestrator();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "too short").unwrap();

        let err = orch.ingest_document(&path, false).await.unwrap_err();
        assert!(matches!(err, PuggError::Ingest(_)));
    }

    #[tokio::test]
    async fn test_rechunk_unknown_document() {
        let orch = orchestrator();
        let err = orch.rechunk_document("missing").await.unwrap_err();
        assert!(matches!(err, PuggError::DocumentNotFound(_)));
    }

    #[test]
    fn test_end_session_skips_empty_sessions() {
        let orch = orchestrator();
        let session = SessionContext::new();
        orch.end_session(&session).unwrap();
        assert!(orch.sqlite_store().list_sessions().unwrap().is_empty());
    }
}
