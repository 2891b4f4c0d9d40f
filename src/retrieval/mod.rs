//! Retrieval of relevant document chunks for a query.
//!
//! The `Retriever` trait is the seam between the agent core and the
//! embedding + vector store machinery, so the core can be tested with stubs.

use crate::embedding::Embedder;
use crate::error::{PuggError, Result};
use crate::vector_store::{SearchResult, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Document ID the chunk came from.
    pub document_id: String,
    /// Document title.
    pub document_title: String,
    /// Text content.
    pub text: String,
    /// Similarity score (higher is better).
    pub score: f32,
}

impl From<SearchResult> for ScoredChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            document_id: result.chunk.document_id,
            document_title: result.chunk.document_title,
            text: result.chunk.content,
            score: result.score,
        }
    }
}

/// Trait for chunk retrieval.
///
/// Fails with `PuggError::Retrieval` if the store is empty or unavailable.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve up to `k` relevant chunks for a query, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Retriever backed by an embedder and a vector store.
pub struct VectorRetriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl VectorRetriever {
    /// Create a new retriever.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            min_score: 0.3,
        }
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[instrument(skip(self), fields(query = %query))]
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.vector_store.chunk_count().await? == 0 {
            return Err(PuggError::Retrieval(
                "No documents indexed yet".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .vector_store
            .search_with_threshold(&query_embedding, k, self.min_score)
            .await?;

        debug!("Retrieved {} chunks for query", results.len());

        Ok(results.into_iter().map(ScoredChunk::from).collect())
    }
}

/// Format retrieved chunks for inclusion in a prompt.
pub fn format_chunks_for_prompt(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "---\n[{}] {}\n{}\n---",
                i + 1,
                chunk.document_title,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{MemoryVectorStore, StoredChunk};

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }
    }

    #[tokio::test]
    async fn test_empty_store_is_a_retrieval_error() {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(FixedEmbedder(vec![1.0, 0.0]));
        let retriever = VectorRetriever::new(store, embedder);

        let err = retriever.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, PuggError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_retrieval_ranks_by_score() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(&StoredChunk::new(
                "doc".to_string(),
                "Doc".to_string(),
                "close match".to_string(),
                vec![1.0, 0.0],
                0,
            ))
            .await
            .unwrap();
        store
            .upsert(&StoredChunk::new(
                "doc".to_string(),
                "Doc".to_string(),
                "weak match".to_string(),
                vec![0.5, 0.5],
                1,
            ))
            .await
            .unwrap();

        let embedder = Arc::new(FixedEmbedder(vec![1.0, 0.0]));
        let retriever = VectorRetriever::new(store, embedder).with_min_score(0.0);

        let chunks = retriever.search("query", 5).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "close match");
        assert!(chunks[0].score > chunks[1].score);
    }

    #[test]
    fn test_format_chunks_for_prompt() {
        let chunks = vec![ScoredChunk {
            document_id: "doc".to_string(),
            document_title: "Biology Notes".to_string(),
            text: "Cells divide by mitosis.".to_string(),
            score: 0.9,
        }];

        let formatted = format_chunks_for_prompt(&chunks);
        assert!(formatted.contains("[1] Biology Notes"));
        assert!(formatted.contains("mitosis"));
    }
}
