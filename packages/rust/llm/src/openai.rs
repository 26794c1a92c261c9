//! OpenAI-compatible HTTP client.
//!
//! Implements [`TextGenerator`] against `POST {base}/chat/completions` and
//! [`Embedder`] against `POST {base}/embeddings`. The API key is read from
//! the configured env var at construction time.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use pressroom_shared::{LlmConfig, PressroomError, Result};

use crate::{Embedder, Embedding, GenerationRequest, TextGenerator};

/// Maximum number of inputs per embeddings call.
const EMBED_BATCH_SIZE: usize = 256;

/// Client for an OpenAI-compatible API.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Build a client from config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                return Err(PressroomError::config(format!(
                    "LLM API key not found. Set the {} environment variable.",
                    config.api_key_env
                )));
            }
        };
        Self::new(config, api_key)
    }

    /// Build a client with an explicit key.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pressroom/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PressroomError::config(format!("http client build: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> std::result::Result<reqwest::Response, String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("{url}: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("{url}: HTTP {status}: {}", truncate(&text, 300)));
        }
        Ok(response)
    }

    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let response = self
            .post_json("/embeddings", &body)
            .await
            .map_err(PressroomError::Embedding)?;

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PressroomError::Embedding(format!("invalid response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(PressroomError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.chat_model, role = %request.role))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut messages = Vec::new();
        if !request.role.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": format!("You are the {}.", request.role),
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.user_message(),
        }));

        let body = serde_json::json!({
            "model": self.chat_model,
            "messages": messages,
        });

        let response = self
            .post_json("/chat/completions", &body)
            .await
            .map_err(PressroomError::Generation)?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PressroomError::Generation(format!("invalid response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PressroomError::Generation("response contained no content".into()))?;

        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_chunk(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| PressroomError::Embedding("empty response from embedding API".into()))
    }

    #[instrument(skip_all, fields(model = %self.embedding_model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut result = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            result.extend(self.embed_chunk(batch).await?);
        }
        Ok(result)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn client_for(server: &MockServer) -> OpenAiClient {
        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        OpenAiClient::new(&config, "sk-test").expect("client")
    }

    #[tokio::test]
    async fn generate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "A briefing." } }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = GenerationRequest {
            role: "Content Strategist".into(),
            instructions: "Write a briefing.".into(),
            ..Default::default()
        };
        let text = client.generate(&request).await.expect("generate");
        assert_eq!(text, "A briefing.");
    }

    #[tokio::test]
    async fn generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate(&GenerationRequest::prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, PressroomError::Generation(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn embeddings_are_reordered_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let vectors = client_for(&server)
            .embed_batch(&["first", "second"])
            .await
            .expect("embed");
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = LlmConfig {
            api_key_env: "PR_TEST_NO_SUCH_LLM_KEY_98765".into(),
            ..LlmConfig::default()
        };
        let err = OpenAiClient::from_config(&config).err().expect("error");
        assert!(err.to_string().contains("PR_TEST_NO_SUCH_LLM_KEY_98765"));
    }
}
