//! Append-only topic history file.
//!
//! Plain text, one topic per line. Lines starting with `#` are comments;
//! each appended topic is preceded by a `# selected_at=<RFC3339>` comment so
//! the selection time can be recovered. A topic that itself starts with `#`
//! or `\` is written with a leading `\`. The file is never rewritten.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use pressroom_shared::{PressroomError, Result, TopicRecord};

const COMMENT_MARKER: char = '#';
const ESCAPE: char = '\\';
const TIMESTAMP_PREFIX: &str = "# selected_at=";
const HEADER: &str = "# pressroom topic history: one selected topic per line, '#' lines are ignored\n";

#[derive(Debug, Clone)]
pub struct TopicHistory {
    path: PathBuf,
}

impl TopicHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded topics in file order. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<TopicRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PressroomError::io(&self.path, e)),
        };
        Ok(parse(&content))
    }

    /// Append `topic` with its selection time, creating the file if needed.
    pub fn append(&self, topic: &str, selected_at: DateTime<Utc>) -> Result<()> {
        let persistence = |e: std::io::Error| {
            PressroomError::Persistence(format!("{}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(persistence)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(persistence)?;
        let is_new = file.metadata().map_err(persistence)?.len() == 0;

        let mut entry = String::new();
        if is_new {
            entry.push_str(HEADER);
        }
        entry.push_str(TIMESTAMP_PREFIX);
        entry.push_str(&selected_at.to_rfc3339());
        entry.push('\n');
        entry.push_str(&escape(&normalize_topic(topic)));
        entry.push('\n');

        file.write_all(entry.as_bytes()).map_err(persistence)
    }
}

/// The form a topic is recorded in: trimmed, with line breaks turned into
/// spaces. Callers compare suggestions in this form against the history.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().replace(['\r', '\n'], " ")
}

fn escape(topic: &str) -> String {
    if topic.starts_with([COMMENT_MARKER, ESCAPE]) {
        format!("{ESCAPE}{topic}")
    } else {
        topic.to_string()
    }
}

fn parse(content: &str) -> Vec<TopicRecord> {
    let mut records = Vec::new();
    let mut pending_time = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(stamp) = line.strip_prefix(TIMESTAMP_PREFIX) {
            pending_time = DateTime::parse_from_rfc3339(stamp.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc));
            continue;
        }
        if line.starts_with(COMMENT_MARKER) {
            continue;
        }
        let topic = line.strip_prefix(ESCAPE).unwrap_or(line);
        records.push(TopicRecord {
            topic: topic.to_string(),
            selected_at: pending_time.take(),
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_history() -> TopicHistory {
        TopicHistory::new(
            std::env::temp_dir()
                .join(format!("pr-history-{}", uuid::Uuid::now_v7()))
                .join("topic_history.txt"),
        )
    }

    #[test]
    fn missing_file_is_empty() {
        assert!(temp_history().load().unwrap().is_empty());
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let records = parse("# header\n\nAlpha\n  # Beta\nGamma  \n");
        let topics: Vec<&str> = records.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["Alpha", "Gamma"]);
        assert!(records.iter().all(|r| r.selected_at.is_none()));
    }

    #[test]
    fn append_writes_header_once_and_keeps_timestamps() {
        let history = temp_history();
        let first = "2026-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let second = "2026-03-02T10:00:00Z".parse::<DateTime<Utc>>().unwrap();

        history.append("Vector databases", first).unwrap();
        history.append("Agent memory", second).unwrap();

        let raw = std::fs::read_to_string(history.path()).unwrap();
        assert_eq!(raw.matches(HEADER.trim_end()).count(), 1);

        let records = history.load().unwrap();
        assert_eq!(
            records,
            vec![
                TopicRecord {
                    topic: "Vector databases".into(),
                    selected_at: Some(first),
                },
                TopicRecord {
                    topic: "Agent memory".into(),
                    selected_at: Some(second),
                },
            ]
        );
        let _ = std::fs::remove_dir_all(history.path().parent().unwrap());
    }

    #[test]
    fn multi_line_topic_is_flattened() {
        let history = temp_history();
        history.append("Line one\nline two", Utc::now()).unwrap();
        let records = history.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "Line one line two");
        let _ = std::fs::remove_dir_all(history.path().parent().unwrap());
    }

    #[test]
    fn hash_prefixed_topic_survives_reload() {
        let history = temp_history();
        history.append("#1 mistake in RAG pipelines", Utc::now()).unwrap();
        history.append("\\escaped already", Utc::now()).unwrap();
        history.append("Plain topic", Utc::now()).unwrap();

        let raw = std::fs::read_to_string(history.path()).unwrap();
        assert!(raw.contains("\n\\#1 mistake in RAG pipelines\n"));

        let topics: Vec<String> = history.load().unwrap().into_iter().map(|r| r.topic).collect();
        assert_eq!(
            topics,
            vec!["#1 mistake in RAG pipelines", "\\escaped already", "Plain topic"]
        );
        let _ = std::fs::remove_dir_all(history.path().parent().unwrap());
    }

    #[test]
    fn carriage_returns_normalize_like_newlines() {
        assert_eq!(normalize_topic("  Part one\r\npart two "), "Part one  part two");
        assert_eq!(normalize_topic("a\rb"), "a b");
    }

    #[test]
    fn unwritable_path_is_a_persistence_error() {
        let dir = std::env::temp_dir().join(format!("pr-history-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        // A directory cannot be opened for appending.
        let err = TopicHistory::new(&dir).append("x", Utc::now()).unwrap_err();
        assert!(matches!(err, PressroomError::Persistence(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
