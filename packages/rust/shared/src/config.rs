//! Application configuration for pressroom.
//!
//! User config lives at `~/.pressroom/pressroom.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored here, only the names of the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PressroomError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pressroom.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pressroom";

// ---------------------------------------------------------------------------
// Config structs (matching pressroom.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus, index and chunking settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Generation and embedding endpoint.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Image generation capability.
    #[serde(default)]
    pub image: ImageConfig,

    /// Publishing capability.
    #[serde(default)]
    pub publishing: PublishingConfig,

    /// Topic scheduling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Run export.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory scanned for `.pdf`, `.txt` and `.md` documents.
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Directory holding the persisted vector index.
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks returned per retrieval query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunks fetched from the index when proposing topics.
    #[serde(default = "default_topic_sample_limit")]
    pub topic_sample_limit: usize,

    /// Chunks (of those fetched) whose text is sent to the generator.
    #[serde(default = "default_topic_sample_chunks")]
    pub topic_sample_chunks: usize,

    /// Number of topics requested from the generator.
    #[serde(default = "default_topic_count")]
    pub topic_count: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            persist_dir: default_persist_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            topic_sample_limit: default_topic_sample_limit(),
            topic_sample_chunks: default_topic_sample_chunks(),
            topic_count: default_topic_count(),
        }
    }
}

impl KnowledgeConfig {
    /// Reject chunking parameters that cannot make forward progress.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PressroomError::config("knowledge.chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PressroomError::config(format!(
                "knowledge.chunk_overlap ({}) must be smaller than knowledge.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("knowledge_base")
}
fn default_persist_dir() -> PathBuf {
    PathBuf::from("index_db")
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    3
}
fn default_topic_sample_limit() -> usize {
    10
}
fn default_topic_sample_chunks() -> usize {
    5
}
fn default_topic_count() -> usize {
    5
}

/// `[llm]` section: any OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL (without trailing slash).
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Chat model used by every stage and by topic suggestion.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model used for ingestion and queries.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Per-request timeout enforced by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_llm_api_key_env(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[image]` section: Stability AI text-to-image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// API host.
    #[serde(default = "default_image_api_base")]
    pub api_base: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_image_api_key_env")]
    pub api_key_env: String,

    /// Engine identifier.
    #[serde(default = "default_engine_id")]
    pub engine_id: String,

    /// Visual style appended to every image prompt.
    #[serde(default = "default_style")]
    pub style: String,

    #[serde(default = "default_image_side")]
    pub width: u32,

    #[serde(default = "default_image_side")]
    pub height: u32,

    #[serde(default = "default_steps")]
    pub steps: u32,

    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: u32,

    /// Directory generated images are written to.
    #[serde(default = "default_image_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_base: default_image_api_base(),
            api_key_env: default_image_api_key_env(),
            engine_id: default_engine_id(),
            style: default_style(),
            width: default_image_side(),
            height: default_image_side(),
            steps: default_steps(),
            cfg_scale: default_cfg_scale(),
            output_dir: default_image_output_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_image_api_base() -> String {
    "https://api.stability.ai".into()
}
fn default_image_api_key_env() -> String {
    "STABILITY_API_KEY".into()
}
fn default_engine_id() -> String {
    "stable-diffusion-v1-6".into()
}
fn default_style() -> String {
    "minimalist technical illustration".into()
}
fn default_image_side() -> u32 {
    512
}
fn default_steps() -> u32 {
    30
}
fn default_cfg_scale() -> u32 {
    7
}
fn default_image_output_dir() -> PathBuf {
    PathBuf::from("outputs/images")
}

/// `[publishing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// Site root used to build draft preview references.
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
        }
    }
}

fn default_site_url() -> String {
    "https://example.com".into()
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Newline-delimited history of selected topics.
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Topic used when the knowledge store proposes nothing.
    #[serde(default = "default_topic")]
    pub default_topic: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            default_topic: default_topic(),
        }
    }
}

fn default_history_file() -> PathBuf {
    PathBuf::from("topic_history.txt")
}
fn default_topic() -> String {
    "The Multi-Agent Systems Revolution in WordPress Content Automation".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory run exports are written to.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Whether completed runs are exported automatically.
    #[serde(default = "default_true")]
    pub export: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            export: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pressroom/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PressroomError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pressroom/pressroom.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PressroomError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PressroomError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.knowledge.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_at(&config_file_path()?)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| PressroomError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PressroomError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| PressroomError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

/// Check that the generation/embedding API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(PressroomError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("corpus_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("STABILITY_API_KEY"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[knowledge]
corpus_dir = "/srv/corpus"
top_k = 5

[scheduler]
default_topic = "Edge caching explained"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.knowledge.corpus_dir, PathBuf::from("/srv/corpus"));
        assert_eq!(config.knowledge.top_k, 5);
        assert_eq!(config.knowledge.chunk_size, 1000);
        assert_eq!(config.knowledge.chunk_overlap, 200);
        assert_eq!(config.scheduler.default_topic, "Edge caching explained");
        assert_eq!(config.scheduler.history_file, PathBuf::from("topic_history.txt"));
        assert_eq!(config.image.engine_id, "stable-diffusion-v1-6");
        assert!(config.output.export);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut knowledge = KnowledgeConfig::default();
        assert!(knowledge.validate().is_ok());

        knowledge.chunk_overlap = knowledge.chunk_size;
        let err = knowledge.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn load_from_file_rejects_bad_chunking() {
        let dir = std::env::temp_dir().join(format!("pr-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[knowledge]\nchunk_size = 100\nchunk_overlap = 150\n").unwrap();

        assert!(load_config_from(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn init_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("pr-config-{}", uuid::Uuid::now_v7()));
        let path = init_config_at(&dir.join(CONFIG_FILE_NAME)).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.llm.chat_model, "gpt-4o-mini");
        assert_eq!(loaded.knowledge.topic_count, 5);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "PR_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
