//! Core domain records shared across pressroom crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// KnowledgeChunk
// ---------------------------------------------------------------------------

/// One embedded slice of a corpus document, as persisted in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Path of the source document relative to the corpus directory.
    pub source_id: String,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
    /// Chunk text.
    pub text: String,
    /// Embedding vector for `text`.
    pub embedding: Vec<f32>,
    /// SHA-256 of `text`; the chunk's identity in the index.
    pub content_hash: String,
}

/// SHA-256 hex digest of a text, used as chunk identity.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// TopicRecord
// ---------------------------------------------------------------------------

/// A previously selected topic from the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Topic text exactly as selected.
    pub topic: String,
    /// When it was selected, if the history recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn content_hash_is_stable_and_content_based() {
        let a = content_hash("retrieval-augmented generation");
        let b = content_hash("retrieval-augmented generation");
        let c = content_hash("retrieval augmented generation");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn chunk_serialization() {
        let chunk = KnowledgeChunk {
            source_id: "guides/intro.md".into(),
            chunk_index: 2,
            text: "Agents coordinate through tasks.".into(),
            embedding: vec![0.25, -0.5, 1.0],
            content_hash: content_hash("Agents coordinate through tasks."),
        };
        let json = serde_json::to_string(&chunk).expect("serialize");
        let parsed: KnowledgeChunk = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, chunk);
    }
}
