//! Corpus discovery and text extraction.
//!
//! Walks the corpus directory recursively, picks up `.pdf`, `.txt` and `.md`
//! files (extension match is case-insensitive) and extracts their text.
//! Paths are returned sorted so ingestion order is deterministic.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use pressroom_shared::{PressroomError, Result};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    /// Classify a path by extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// A document whose text has been extracted.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Path relative to the corpus directory, `/`-separated.
    pub source_id: String,
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub text: String,
}

/// Ensure the corpus directory exists. Returns `true` if it had to be created.
pub fn ensure_corpus_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir).map_err(|e| PressroomError::io(dir, e))?;
    Ok(true)
}

/// All supported documents under `dir`, sorted by path.
pub fn discover(dir: &Path) -> Vec<(PathBuf, DocumentKind)> {
    let mut found: Vec<(PathBuf, DocumentKind)> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable corpus entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let kind = DocumentKind::from_path(entry.path())?;
            Some((entry.into_path(), kind))
        })
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0));
    found
}

/// Extract the text of one document.
pub fn load(corpus_dir: &Path, path: &Path, kind: DocumentKind) -> Result<LoadedDocument> {
    let text = match kind {
        DocumentKind::Text | DocumentKind::Markdown => {
            let bytes = std::fs::read(path).map_err(|e| PressroomError::io(path, e))?;
            String::from_utf8(bytes)
                .map_err(|e| PressroomError::ingestion(path, format!("not valid UTF-8: {e}")))?
        }
        DocumentKind::Pdf => pdf_extract::extract_text(path)
            .map_err(|e| PressroomError::ingestion(path, format!("pdf extraction failed: {e}")))?,
    };

    Ok(LoadedDocument {
        source_id: source_id(corpus_dir, path),
        path: path.to_path_buf(),
        kind,
        text,
    })
}

fn source_id(corpus_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(corpus_dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
