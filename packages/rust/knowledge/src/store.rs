//! [`KnowledgeStore`]: ingest, persist, query and topic suggestion.
//!
//! The persisted index is a libSQL database inside `persist_dir`. It is
//! opened lazily: a fresh process can query an index written by an earlier
//! one without re-ingesting. Query and topic suggestion never fail outward.
//! Upstream problems (no index, embedding service down, storage errors)
//! become the uninitialized sentinel or an empty topic list.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use pressroom_llm::{Embedder, GenerationRequest, TextGenerator};
use pressroom_shared::{KnowledgeChunk, KnowledgeConfig, PressroomError, Result, content_hash};
use pressroom_storage::{INDEX_FILE_NAME, Storage};

use crate::chunker::ChunkConfig;
use crate::loader::{self, LoadedDocument};
use crate::topics;

/// Returned by [`KnowledgeStore::query`] when there is nothing to search.
pub const UNINITIALIZED_SENTINEL: &str = "Knowledge base not initialized or empty.";

/// Whether a query result is the uninitialized sentinel.
pub fn is_uninitialized(text: &str) -> bool {
    text.trim() == UNINITIALIZED_SENTINEL
}

/// Summary of one `load_and_index` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub documents_found: usize,
    pub documents_indexed: usize,
    /// Unreadable or whitespace-only documents.
    pub documents_skipped: usize,
    pub chunks_added: usize,
    /// Chunks whose content hash was already indexed (or repeated in this batch).
    pub chunks_existing: usize,
    pub elapsed: Duration,
}

pub struct KnowledgeStore {
    config: KnowledgeConfig,
    chunking: ChunkConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    index: Mutex<Option<Storage>>,
}

impl KnowledgeStore {
    /// Create a store. Nothing is read from disk until first use.
    pub fn new(
        config: KnowledgeConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let chunking = ChunkConfig::try_from(&config)?;
        Ok(Self {
            config,
            chunking,
            embedder,
            generator,
            index: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    fn index_path(&self) -> PathBuf {
        self.config.persist_dir.join(INDEX_FILE_NAME)
    }

    /// Scan the corpus, embed every chunk not yet indexed, and persist it.
    ///
    /// An empty corpus leaves the store untouched. Per-document read failures
    /// are counted and skipped; embedding and storage failures abort.
    #[instrument(skip_all, fields(corpus = %self.config.corpus_dir.display()))]
    pub async fn load_and_index(&self) -> Result<IngestReport> {
        let started = Instant::now();
        let corpus_dir = self.config.corpus_dir.as_path();

        if loader::ensure_corpus_dir(corpus_dir)? {
            info!("created empty corpus directory");
        }

        let found = loader::discover(corpus_dir);
        let mut report = IngestReport {
            documents_found: found.len(),
            ..Default::default()
        };

        let mut documents: Vec<LoadedDocument> = Vec::with_capacity(found.len());
        for (path, kind) in found {
            match loader::load(corpus_dir, &path, kind) {
                Ok(doc) if doc.text.trim().is_empty() => {
                    warn!(source = %doc.source_id, "skipping document with no text");
                    report.documents_skipped += 1;
                }
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable document");
                    report.documents_skipped += 1;
                }
            }
        }

        if documents.is_empty() {
            info!("corpus is empty, nothing to index");
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let mut guard = self.index.lock().await;
        let storage = match guard.take() {
            Some(storage) => storage,
            None => Storage::open(&self.index_path()).await?,
        };
        let outcome = self.ingest(&storage, &documents, &mut report).await;
        *guard = Some(storage);
        outcome?;

        report.elapsed = started.elapsed();
        info!(
            documents = report.documents_indexed,
            skipped = report.documents_skipped,
            added = report.chunks_added,
            existing = report.chunks_existing,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "indexing complete"
        );
        Ok(report)
    }

    async fn ingest(
        &self,
        storage: &Storage,
        documents: &[LoadedDocument],
        report: &mut IngestReport,
    ) -> Result<()> {
        let run_id = storage
            .insert_ingest_run(&self.config.corpus_dir.display().to_string())
            .await?;

        let mut seen = HashSet::new();
        let mut pending: Vec<KnowledgeChunk> = Vec::new();

        for doc in documents {
            for (chunk_index, text) in self.chunking.split(&doc.text).into_iter().enumerate() {
                let hash = content_hash(&text);
                if !seen.insert(hash.clone()) || storage.contains_chunk(&hash).await? {
                    report.chunks_existing += 1;
                    continue;
                }
                pending.push(KnowledgeChunk {
                    source_id: doc.source_id.clone(),
                    chunk_index,
                    text,
                    embedding: Vec::new(),
                    content_hash: hash,
                });
            }
            report.documents_indexed += 1;
        }

        if !pending.is_empty() {
            let texts: Vec<&str> = pending.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != pending.len() {
                return Err(PressroomError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    pending.len(),
                    embeddings.len()
                )));
            }

            for (mut chunk, embedding) in pending.into_iter().zip(embeddings) {
                chunk.embedding = embedding;
                if storage.insert_chunk(&chunk).await? {
                    report.chunks_added += 1;
                } else {
                    report.chunks_existing += 1;
                }
                debug!(source = %chunk.source_id, index = chunk.chunk_index, "chunk indexed");
            }
        }

        let stats = serde_json::to_string(&*report)
            .map_err(|e| PressroomError::Storage(format!("encode ingest stats: {e}")))?;
        storage.finish_ingest_run(&run_id, &stats).await
    }

    /// The `k` chunks closest to `text`, closest first, separated by blank
    /// lines. Returns [`UNINITIALIZED_SENTINEL`] instead of failing.
    #[instrument(skip_all, fields(k = k))]
    pub async fn query(&self, text: &str, k: usize) -> String {
        match self.try_query(text, k).await {
            Ok(Some(context)) => context,
            Ok(None) => UNINITIALIZED_SENTINEL.to_string(),
            Err(e) => {
                warn!(error = %e, "knowledge query failed, reporting store as uninitialized");
                UNINITIALIZED_SENTINEL.to_string()
            }
        }
    }

    async fn try_query(&self, text: &str, k: usize) -> Result<Option<String>> {
        let mut guard = self.index.lock().await;
        let Some(storage) = self.ensure_loaded(&mut guard).await? else {
            return Ok(None);
        };

        let chunks = storage.all_chunks().await?;
        if chunks.is_empty() {
            return Ok(None);
        }

        let query = self.embedder.embed(text).await?;
        let mut ranked: Vec<(f32, usize)> = chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| (squared_l2(&query, &chunk.embedding), position))
            .collect();
        // Stable sort keeps insertion order among equal distances.
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let context = ranked
            .into_iter()
            .take(k)
            .map(|(_, position)| chunks[position].text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!(chunks = chunks.len(), returned = k.min(chunks.len()), "query ranked");
        Ok(Some(context))
    }

    /// Ask the generator for candidate topics drawn from the indexed corpus.
    ///
    /// Samples the first chunks by insertion order rather than at random.
    /// Returns an empty list when the store is uninitialized or generation fails.
    #[instrument(skip_all)]
    pub async fn suggest_topics(&self) -> Vec<String> {
        match self.try_suggest_topics().await {
            Ok(topics) => topics,
            Err(e) => {
                warn!(error = %e, "topic suggestion failed");
                Vec::new()
            }
        }
    }

    async fn try_suggest_topics(&self) -> Result<Vec<String>> {
        let sample = {
            let mut guard = self.index.lock().await;
            let Some(storage) = self.ensure_loaded(&mut guard).await? else {
                return Ok(Vec::new());
            };
            storage.first_chunks(self.config.topic_sample_limit).await?
        };
        if sample.is_empty() {
            return Ok(Vec::new());
        }

        let excerpt = sample
            .iter()
            .take(self.config.topic_sample_chunks)
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = topics::suggestion_prompt(&excerpt, self.config.topic_count);
        let response = self
            .generator
            .generate(&GenerationRequest::prompt(prompt))
            .await?;

        let topics = topics::parse_topics(&response);
        info!(count = topics.len(), "topics suggested");
        Ok(topics)
    }

    /// Number of indexed chunks, or `None` when no index has been persisted.
    pub async fn chunk_count(&self) -> Result<Option<usize>> {
        let mut guard = self.index.lock().await;
        match self.ensure_loaded(&mut guard).await? {
            Some(storage) => storage.chunk_count().await.map(Some),
            None => Ok(None),
        }
    }

    /// Stats JSON recorded by the most recent finished ingest, or `None`
    /// when nothing has been indexed yet.
    pub async fn last_ingest_stats(&self) -> Result<Option<String>> {
        let mut guard = self.index.lock().await;
        match self.ensure_loaded(&mut guard).await? {
            Some(storage) => storage.last_ingest_stats().await,
            None => Ok(None),
        }
    }

    async fn ensure_loaded<'a>(&self, slot: &'a mut Option<Storage>) -> Result<Option<&'a Storage>> {
        if slot.is_none() {
            if let Some(storage) = Storage::open_existing(&self.config.persist_dir).await? {
                debug!(path = %self.index_path().display(), "loaded persisted index");
                *slot = Some(storage);
            }
        }
        Ok(slot.as_ref())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
