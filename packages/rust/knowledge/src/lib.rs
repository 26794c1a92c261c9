//! Retrieval-augmented knowledge store.
//!
//! This crate provides:
//! - [`chunker`]: fixed-size, overlapping character chunking
//! - [`loader`]: recursive corpus discovery and text extraction (txt, md, pdf)
//! - [`store`]: [`KnowledgeStore`]: ingest → chunk → embed → persist → query
//! - [`topics`]: the topic-suggestion prompt and its response parser

pub mod chunker;
pub mod loader;
pub mod store;
pub mod topics;

pub use chunker::ChunkConfig;
pub use loader::{DocumentKind, LoadedDocument};
pub use store::{IngestReport, KnowledgeStore, UNINITIALIZED_SENTINEL, is_uninitialized};
pub use topics::parse_topics;
