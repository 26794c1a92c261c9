//! Shared types, error model, and configuration for pressroom.
//!
//! This crate is the foundation depended on by all other pressroom crates.
//! It provides:
//! - [`PressroomError`]: the unified error type
//! - Domain records ([`KnowledgeChunk`], [`TopicRecord`], [`RunId`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ImageConfig, KnowledgeConfig, LlmConfig, OutputConfig, PublishingConfig,
    SchedulerConfig, config_dir, config_file_path, init_config, init_config_at, load_config,
    load_config_from, validate_api_key,
};
pub use error::{PressroomError, Result};
pub use types::{KnowledgeChunk, RunId, TopicRecord, content_hash};
