//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large datasets, consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{cosine_similarity, IndexedDocument, SearchResult, StoredChunk, VectorStore};
use crate::error::{PuggError, Result};
use crate::memory::SessionRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    document_title TEXT NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    chunk_order INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_chunks_indexed_at ON chunks(indexed_at);

CREATE TABLE IF NOT EXISTS sources (
    document_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    char_count INTEGER NOT NULL,
    extracted_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    interaction_count INTEGER NOT NULL,
    tool_usage_json TEXT NOT NULL,
    topics_json TEXT NOT NULL
);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PuggError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredChunk> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let indexed_at_str: String = row.get(6)?;

        Ok(StoredChunk {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            document_id: row.get(1)?,
            document_title: row.get(2)?,
            content: row.get(3)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            chunk_order: row.get(5)?,
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunk))]
    async fn upsert(&self, chunk: &StoredChunk) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO chunks
            (id, document_id, document_title, content, embedding, chunk_order, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                chunk.id.to_string(),
                chunk.document_id,
                chunk.document_title,
                chunk.content,
                Self::embedding_to_bytes(&chunk.embedding),
                chunk.chunk_order,
                chunk.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted chunk {}", chunk.id);
        Ok(())
    }

    #[instrument(skip(self, chunks))]
    async fn upsert_batch(&self, chunks: &[StoredChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, document_id, document_title, content, embedding, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.document_id,
                    chunk.document_title,
                    chunk.content,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.chunk_order,
                    chunk.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, 0.0).await
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, document_id, document_title, content, embedding, chunk_order, indexed_at
            FROM chunks
            "#,
        )?;

        let chunks = stmt.query_map([], Self::row_to_chunk)?;

        let mut results: Vec<SearchResult> = chunks
            .filter_map(|chunk_result| chunk_result.ok())
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                SearchResult { chunk, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )?;

        info!("Deleted {} chunks for document {}", deleted, document_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT document_id, document_title, COUNT(*) as chunk_count,
                   SUM(LENGTH(content)) as total_chars, MAX(indexed_at) as indexed_at
            FROM chunks
            GROUP BY document_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let documents = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(4)?;
            Ok(IndexedDocument {
                document_id: row.get(0)?,
                title: row.get(1)?,
                chunk_count: row.get(2)?,
                total_chars: row.get::<_, i64>(3)? as u64,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result: Vec<IndexedDocument> = documents.filter_map(|d| d.ok()).collect();
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_document(&self, document_id: &str) -> Result<Option<IndexedDocument>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT document_id, document_title, COUNT(*) as chunk_count,
                   SUM(LENGTH(content)) as total_chars, MAX(indexed_at) as indexed_at
            FROM chunks
            WHERE document_id = ?1
            GROUP BY document_id
            "#,
        )?;

        let document = stmt.query_row(params![document_id], |row| {
            let indexed_at_str: String = row.get(4)?;
            Ok(IndexedDocument {
                document_id: row.get(0)?,
                title: row.get(1)?,
                chunk_count: row.get(2)?,
                total_chars: row.get::<_, i64>(3)? as u64,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        });

        match document {
            Ok(d) => Ok(Some(d)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_document_indexed(&self, document_id: &str) -> Result<bool> {
        let document = self.get_document(document_id).await?;
        Ok(document.is_some())
    }

    #[instrument(skip(self))]
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<StoredChunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, document_id, document_title, content, embedding, chunk_order, indexed_at
            FROM chunks
            WHERE document_id = ?1
            ORDER BY chunk_order
            "#,
        )?;

        let chunks = stmt.query_map(params![document_id], Self::row_to_chunk)?;

        let result: Vec<StoredChunk> = chunks.filter_map(|c| c.ok()).collect();
        debug!("Found {} chunks for document {}", result.len(), document_id);
        Ok(result)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// Raw source text storage for re-chunking (not part of the VectorStore trait)
impl SqliteVectorStore {
    /// Store a document's extracted text so it can be re-chunked later.
    pub fn store_source(&self, document_id: &str, title: &str, text: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO sources (document_id, title, text, char_count, extracted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                document_id,
                title,
                text,
                text.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        info!("Stored source text for document {}", document_id);
        Ok(())
    }

    /// Retrieve a document's stored source text.
    pub fn get_source(&self, document_id: &str) -> Result<Option<(String, String)>> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT title, text FROM sources WHERE document_id = ?1",
            params![document_id],
            |row| {
                let title: String = row.get(0)?;
                let text: String = row.get(1)?;
                Ok((title, text))
            },
        );

        match result {
            Ok(source) => Ok(Some(source)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all stored sources as (document_id, title, char_count).
    pub fn list_sources(&self) -> Result<Vec<(String, String, u64)>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT document_id, title, char_count FROM sources ORDER BY extracted_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u64))
        })?;

        let result: Vec<(String, String, u64)> = rows.filter_map(|r| r.ok()).collect();
        Ok(result)
    }

    /// Delete a document's stored source text.
    pub fn delete_source(&self, document_id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM sources WHERE document_id = ?1",
            params![document_id],
        )?;

        Ok(deleted > 0)
    }
}

// Session history storage (the cross-session half of the memory system)
impl SqliteVectorStore {
    /// Persist a completed session.
    pub fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO sessions
            (session_id, started_at, ended_at, interaction_count, tool_usage_json, topics_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.session_id,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.interaction_count,
                serde_json::to_string(&record.tool_usage)?,
                serde_json::to_string(&record.topics)?,
            ],
        )?;

        info!("Saved session {}", record.session_id);
        Ok(())
    }

    /// Load all stored sessions, most recent first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT session_id, started_at, ended_at, interaction_count, tool_usage_json, topics_json
            FROM sessions
            ORDER BY ended_at DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let started_at_str: String = row.get(1)?;
            let ended_at_str: String = row.get(2)?;
            let tool_usage_json: String = row.get(4)?;
            let topics_json: String = row.get(5)?;
            Ok((
                row.get::<_, String>(0)?,
                started_at_str,
                ended_at_str,
                row.get::<_, u32>(3)?,
                tool_usage_json,
                topics_json,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows.filter_map(|r| r.ok()) {
            let (session_id, started_at, ended_at, interaction_count, tool_usage_json, topics_json) =
                row;
            sessions.push(SessionRecord {
                session_id,
                started_at: DateTime::parse_from_rfc3339(&started_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                ended_at: DateTime::parse_from_rfc3339(&ended_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                interaction_count,
                tool_usage: serde_json::from_str(&tool_usage_json)?,
                topics: serde_json::from_str(&topics_json)?,
            });
        }

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let chunk = StoredChunk::new(
            "algo-notes".to_string(),
            "Algorithms Notes".to_string(),
            "Binary search runs in O(log n)".to_string(),
            vec![1.0, 0.0, 0.0],
            0,
        );

        store.upsert(&chunk).await.unwrap();

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].document_id, "algo-notes");

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);

        let deleted = store.delete_by_document("algo-notes").await.unwrap();
        assert_eq!(deleted, 1);

        let documents = store.list_documents().await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        let store = SqliteVectorStore::new(&path).unwrap();
        let chunk = StoredChunk::new(
            "doc".to_string(),
            "Doc".to_string(),
            "content".to_string(),
            vec![0.5, 0.5],
            0,
        );
        store.upsert(&chunk).await.unwrap();
        drop(store);

        let reopened = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(reopened.chunk_count().await.unwrap(), 1);

        let chunks = reopened.get_by_document("doc").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].embedding, vec![0.5, 0.5]);
    }

    #[test]
    fn test_source_storage() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .store_source("doc", "My Notes", "Some extracted text")
            .unwrap();

        let (title, text) = store.get_source("doc").unwrap().unwrap();
        assert_eq!(title, "My Notes");
        assert_eq!(text, "Some extracted text");

        let sources = store.list_sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].2, 19);

        assert!(store.delete_source("doc").unwrap());
        assert!(store.get_source("doc").unwrap().is_none());
    }

    #[test]
    fn test_session_storage() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let session = crate::memory::SessionContext::new();
        let mut record = session.to_record();
        record.interaction_count = 3;
        record.tool_usage.insert("explain".to_string(), 2);

        store.save_session(&record).unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].interaction_count, 3);
        assert_eq!(sessions[0].tool_usage.get("explain"), Some(&2));
    }
}
