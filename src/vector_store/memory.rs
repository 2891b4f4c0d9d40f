//! In-memory vector store implementation.
//!
//! Useful for testing and throwaway sessions.

use super::{cosine_similarity, IndexedDocument, SearchResult, StoredChunk, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    chunks: RwLock<HashMap<String, StoredChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunk: &StoredChunk) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap();
        chunks.insert(chunk.id.to_string(), chunk.clone());
        Ok(())
    }

    async fn upsert_batch(&self, batch: &[StoredChunk]) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        for chunk in batch {
            chunks.insert(chunk.id.to_string(), chunk.clone());
        }
        Ok(batch.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, 0.0).await
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let chunks = self.chunks.read().unwrap();

        let mut results: Vec<SearchResult> = chunks
            .values()
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                SearchResult {
                    chunk: chunk.clone(),
                    score,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        let initial_len = chunks.len();
        chunks.retain(|_, chunk| chunk.document_id != document_id);
        Ok(initial_len - chunks.len())
    }

    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let chunks = self.chunks.read().unwrap();

        let mut doc_map: HashMap<String, IndexedDocument> = HashMap::new();

        for chunk in chunks.values() {
            let entry = doc_map
                .entry(chunk.document_id.clone())
                .or_insert_with(|| IndexedDocument {
                    document_id: chunk.document_id.clone(),
                    title: chunk.document_title.clone(),
                    chunk_count: 0,
                    total_chars: 0,
                    indexed_at: chunk.indexed_at,
                });

            entry.chunk_count += 1;
            entry.total_chars += chunk.content.len() as u64;
            if chunk.indexed_at > entry.indexed_at {
                entry.indexed_at = chunk.indexed_at;
            }
        }

        let mut documents: Vec<IndexedDocument> = doc_map.into_values().collect();
        documents.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));

        Ok(documents)
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<IndexedDocument>> {
        let documents = self.list_documents().await?;
        Ok(documents.into_iter().find(|d| d.document_id == document_id))
    }

    async fn is_document_indexed(&self, document_id: &str) -> Result<bool> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks.values().any(|c| c.document_id == document_id))
    }

    async fn get_by_document(&self, document_id: &str) -> Result<Vec<StoredChunk>> {
        let chunks = self.chunks.read().unwrap();
        let mut result: Vec<StoredChunk> = chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.chunk_order);
        Ok(result)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let chunk1 = StoredChunk::new(
            "notes".to_string(),
            "Lecture Notes".to_string(),
            "Binary search halves the interval".to_string(),
            vec![1.0, 0.0, 0.0],
            0,
        );

        let chunk2 = StoredChunk::new(
            "notes".to_string(),
            "Lecture Notes".to_string(),
            "Sorting is a precondition".to_string(),
            vec![0.0, 1.0, 0.0],
            1,
        );

        store.upsert_batch(&[chunk1, chunk2]).await.unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].chunk_count, 2);
    }

    #[test]
    fn test_delete_by_document() {
        tokio_test::block_on(async {
            let store = MemoryVectorStore::new();

            let chunk = StoredChunk::new(
                "doc1".to_string(),
                "Doc".to_string(),
                "content".to_string(),
                vec![1.0],
                0,
            );
            store.upsert(&chunk).await.unwrap();

            assert!(store.is_document_indexed("doc1").await.unwrap());
            assert_eq!(store.delete_by_document("doc1").await.unwrap(), 1);
            assert!(!store.is_document_indexed("doc1").await.unwrap());
        });
    }
}
