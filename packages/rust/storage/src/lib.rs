//! libSQL storage layer for the persisted knowledge index.
//!
//! The [`Storage`] struct wraps a local libSQL database holding embedded
//! chunks and the ingestion history. The database file lives inside the
//! configured persist directory and survives process restarts.
//!
//! Chunks are keyed by the SHA-256 of their text, so inserting a chunk whose
//! content is already indexed is a no-op.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use pressroom_shared::{KnowledgeChunk, PressroomError, Result};
use uuid::Uuid;

/// File name of the index database inside the persist directory.
pub const INDEX_FILE_NAME: &str = "chunks.db";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

fn storage_err(e: impl std::fmt::Display) -> PressroomError {
    PressroomError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PressroomError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open the index inside `persist_dir` only if it was persisted earlier.
    pub async fn open_existing(persist_dir: &Path) -> Result<Option<Self>> {
        let path = persist_dir.join(INDEX_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::open(&path).await.map(Some)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PressroomError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Chunk operations
    // -----------------------------------------------------------------------

    /// Whether a chunk with this content hash is already indexed.
    pub async fn contains_chunk(&self, content_hash: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM chunks WHERE content_hash = ?1",
                params![content_hash],
            )
            .await
            .map_err(storage_err)?;

        Ok(rows.next().await.map_err(storage_err)?.is_some())
    }

    /// Insert a chunk. Returns `false` when its content hash was already present.
    pub async fn insert_chunk(&self, chunk: &KnowledgeChunk) -> Result<bool> {
        let embedding_json = serde_json::to_string(&chunk.embedding)
            .map_err(|e| PressroomError::Storage(format!("encode embedding: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let changed = self
            .conn
            .execute(
                "INSERT INTO chunks (content_hash, source_id, chunk_index, text, embedding_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(content_hash) DO NOTHING",
                params![
                    chunk.content_hash.as_str(),
                    chunk.source_id.as_str(),
                    chunk.chunk_index as i64,
                    chunk.text.as_str(),
                    embedding_json,
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(changed > 0)
    }

    /// All chunks in insertion order.
    pub async fn all_chunks(&self) -> Result<Vec<KnowledgeChunk>> {
        self.select_chunks(
            "SELECT content_hash, source_id, chunk_index, text, embedding_json
             FROM chunks ORDER BY rowid",
            None,
        )
        .await
    }

    /// The first `limit` chunks in insertion order.
    pub async fn first_chunks(&self, limit: usize) -> Result<Vec<KnowledgeChunk>> {
        self.select_chunks(
            "SELECT content_hash, source_id, chunk_index, text, embedding_json
             FROM chunks ORDER BY rowid LIMIT ?1",
            Some(limit as i64),
        )
        .await
    }

    async fn select_chunks(&self, sql: &str, limit: Option<i64>) -> Result<Vec<KnowledgeChunk>> {
        let mut rows = match limit {
            Some(limit) => self.conn.query(sql, params![limit]).await,
            None => self.conn.query(sql, params![]).await,
        }
        .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_chunk(&row)?);
        }
        Ok(results)
    }

    /// Number of indexed chunks.
    pub async fn chunk_count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM chunks", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)? as usize),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Ingest run operations
    // -----------------------------------------------------------------------

    /// Record the start of an ingestion. Returns the generated run ID.
    pub async fn insert_ingest_run(&self, corpus_dir: &str) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, corpus_dir, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), corpus_dir, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark an ingestion as finished with its statistics.
    pub async fn finish_ingest_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Stats JSON of the most recently finished ingestion, if any.
    pub async fn last_ingest_stats(&self) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT stats_json FROM ingest_runs
                 WHERE finished_at IS NOT NULL
                 ORDER BY started_at DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<String>(0).ok()),
            None => Ok(None),
        }
    }
}

/// Convert a database row to a [`KnowledgeChunk`].
fn row_to_chunk(row: &libsql::Row) -> Result<KnowledgeChunk> {
    let embedding_json: String = row.get(4).map_err(storage_err)?;
    let embedding: Vec<f32> = serde_json::from_str(&embedding_json)
        .map_err(|e| PressroomError::Storage(format!("invalid embedding: {e}")))?;

    Ok(KnowledgeChunk {
        content_hash: row.get::<String>(0).map_err(storage_err)?,
        source_id: row.get::<String>(1).map_err(storage_err)?,
        chunk_index: row.get::<i64>(2).map_err(storage_err)? as usize,
        text: row.get::<String>(3).map_err(storage_err)?,
        embedding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_shared::content_hash;

    fn temp_persist_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pr_index_{}", Uuid::now_v7()))
    }

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        Storage::open(&temp_persist_dir().join(INDEX_FILE_NAME))
            .await
            .expect("open test db")
    }

    fn chunk(source: &str, index: usize, text: &str) -> KnowledgeChunk {
        KnowledgeChunk {
            source_id: source.into(),
            chunk_index: index,
            text: text.into(),
            embedding: vec![index as f32, 0.5, -1.0],
            content_hash: content_hash(text),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let path = temp_persist_dir().join(INDEX_FILE_NAME);
        let s1 = Storage::open(&path).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&path).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn open_existing_requires_persisted_file() {
        let dir = temp_persist_dir();
        assert!(Storage::open_existing(&dir).await.unwrap().is_none());

        Storage::open(&dir.join(INDEX_FILE_NAME)).await.unwrap();
        assert!(Storage::open_existing(&dir).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_content_is_not_reinserted() {
        let storage = test_storage().await;
        let first = chunk("a.md", 0, "identical text");
        let again = chunk("b.md", 3, "identical text");

        assert!(storage.insert_chunk(&first).await.unwrap());
        assert!(!storage.insert_chunk(&again).await.unwrap());
        assert_eq!(storage.chunk_count().await.unwrap(), 1);
        assert!(storage.contains_chunk(&first.content_hash).await.unwrap());

        let stored = storage.all_chunks().await.unwrap();
        assert_eq!(stored[0].source_id, "a.md");
        assert_eq!(stored[0].embedding, vec![0.0, 0.5, -1.0]);
    }

    #[tokio::test]
    async fn first_chunks_follow_insertion_order() {
        let storage = test_storage().await;
        for i in 0..4 {
            storage
                .insert_chunk(&chunk("doc.txt", i, &format!("part {i}")))
                .await
                .unwrap();
        }

        let first = storage.first_chunks(2).await.unwrap();
        let texts: Vec<_> = first.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["part 0", "part 1"]);
    }

    #[tokio::test]
    async fn chunks_survive_reopen() {
        let dir = temp_persist_dir();
        {
            let storage = Storage::open(&dir.join(INDEX_FILE_NAME)).await.unwrap();
            storage.insert_chunk(&chunk("x.md", 0, "durable")).await.unwrap();
        }
        let reopened = Storage::open_existing(&dir).await.unwrap().unwrap();
        let chunks = reopened.all_chunks().await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "durable");
    }

    #[tokio::test]
    async fn ingest_run_lifecycle() {
        let storage = test_storage().await;
        assert!(storage.last_ingest_stats().await.unwrap().is_none());

        let run_id = storage.insert_ingest_run("knowledge_base").await.unwrap();
        assert!(!run_id.is_empty());
        storage
            .finish_ingest_run(&run_id, r#"{"chunks_added": 4}"#)
            .await
            .unwrap();

        let stats = storage.last_ingest_stats().await.unwrap();
        assert!(stats.unwrap().contains("chunks_added"));
    }
}
