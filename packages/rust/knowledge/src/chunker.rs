//! Character-window chunking.
//!
//! A document of `L` characters is cut into windows of at most `size`
//! characters, each starting `size - overlap` characters after the previous
//! one. Consecutive chunks therefore share exactly `overlap` characters and
//! only the final chunk may be shorter.

use pressroom_shared::{KnowledgeConfig, PressroomError, Result};

/// Chunking parameters. Construct through [`ChunkConfig::new`] so that
/// `overlap < size` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 || overlap >= size {
            return Err(PressroomError::config(format!(
                "chunk overlap ({overlap}) must be smaller than a positive chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping chunks. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
        }
    }
}

impl TryFrom<&KnowledgeConfig> for ChunkConfig {
    type Error = PressroomError;

    fn try_from(config: &KnowledgeConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}
