//! Vector store abstraction for Pugg.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk of document text stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Document ID this chunk belongs to.
    pub document_id: String,
    /// Document title.
    pub document_title: String,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Order of this chunk in the document.
    pub chunk_order: i32,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl StoredChunk {
    /// Create a new chunk.
    pub fn new(
        document_id: String,
        document_title: String,
        content: String,
        embedding: Vec<f32>,
        chunk_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            document_title,
            content,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: StoredChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Document ID.
    pub document_id: String,
    /// Document title.
    pub title: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// Total characters of indexed content.
    pub total_chars: u64,
    /// When the document was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a chunk with its embedding.
    async fn upsert(&self, chunk: &StoredChunk) -> Result<()>;

    /// Bulk upsert chunks.
    async fn upsert_batch(&self, chunks: &[StoredChunk]) -> Result<usize>;

    /// Search for similar chunks.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete chunks by document ID.
    async fn delete_by_document(&self, document_id: &str) -> Result<usize>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>>;

    /// Get a specific document's information.
    async fn get_document(&self, document_id: &str) -> Result<Option<IndexedDocument>>;

    /// Check if a document is indexed.
    async fn is_document_indexed(&self, document_id: &str) -> Result<bool>;

    /// Get all chunks for a document, in chunk order.
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<StoredChunk>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
