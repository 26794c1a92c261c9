//! Cross-run topic selection.
//!
//! Each cycle reloads the history, then lands in exactly one state:
//!
//! - [`SelectionState::NoCandidates`]: nothing suggested, use the default
//!   topic and leave the history alone.
//! - [`SelectionState::CandidatesAvailable`]: draw uniformly from the
//!   suggestions not yet in the history.
//! - [`SelectionState::AllExhausted`]: every suggestion was used before, so
//!   draw from the full suggested set. Repeats are allowed and the history
//!   is never cleared.
//!
//! Suggestions are compared in their recorded form (see [`normalize_topic`])
//! by exact string equality. Corpus-drawn topics are appended to
//! the history before the selection is returned.

pub mod history;

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};

use pressroom_shared::SchedulerConfig;

pub use history::{TopicHistory, normalize_topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    NoCandidates,
    CandidatesAvailable,
    AllExhausted,
}

/// Outcome of one scheduling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub topic: String,
    pub state: SelectionState,
    /// Whether the topic was appended to the history file.
    pub recorded: bool,
}

pub struct TopicScheduler {
    history: TopicHistory,
    default_topic: String,
}

impl TopicScheduler {
    pub fn new(history_path: impl Into<PathBuf>, default_topic: impl Into<String>) -> Self {
        Self {
            history: TopicHistory::new(history_path),
            default_topic: default_topic.into(),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(&config.history_file, &config.default_topic)
    }

    pub fn history(&self) -> &TopicHistory {
        &self.history
    }

    pub fn default_topic(&self) -> &str {
        &self.default_topic
    }

    /// Pick the topic for this cycle from `suggested`.
    ///
    /// Never fails: an unreadable history counts as empty and a failed
    /// append is reported through [`Selection::recorded`].
    pub fn next_topic<R: Rng + ?Sized>(&self, suggested: &[String], rng: &mut R) -> Selection {
        let candidates = unique(suggested);
        if candidates.is_empty() {
            info!(topic = %self.default_topic, "no suggested topics, using default");
            return Selection {
                topic: self.default_topic.clone(),
                state: SelectionState::NoCandidates,
                recorded: false,
            };
        }

        let used: HashSet<String> = match self.history.load() {
            Ok(records) => records.into_iter().map(|r| r.topic).collect(),
            Err(e) => {
                warn!(error = %e, "could not read topic history, treating it as empty");
                HashSet::new()
            }
        };

        let available: Vec<&str> = candidates
            .iter()
            .map(String::as_str)
            .filter(|topic| !used.contains(*topic))
            .collect();

        let (state, pool): (SelectionState, Vec<&str>) = if available.is_empty() {
            (
                SelectionState::AllExhausted,
                candidates.iter().map(String::as_str).collect(),
            )
        } else {
            (SelectionState::CandidatesAvailable, available)
        };

        // `pool` is never empty here: `candidates` was checked above.
        let topic = pool.choose(rng).copied().unwrap_or(pool[0]).to_string();

        let recorded = match self.history.append(&topic, Utc::now()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "could not record topic in history");
                false
            }
        };

        info!(
            %topic,
            ?state,
            pool = pool.len(),
            history = used.len(),
            "topic selected"
        );
        Selection {
            topic,
            state,
            recorded,
        }
    }
}

/// Non-blank suggestions in recorded form, first occurrence wins.
fn unique(suggested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    suggested
        .iter()
        .map(|s| normalize_topic(s))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
