//! Cover image generation through the Stability AI v1 text-to-image API.
//!
//! Every failure mode degrades: a missing or placeholder key skips the
//! network entirely, and HTTP or decoding errors are reported in the artifact.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use pressroom_shared::{ImageConfig, PressroomError, Result};

use crate::{Artifact, CapabilityKind, ImageProvider, ImageRequest};

/// Value shipped in sample `.env` files; treated as "not configured".
pub const PLACEHOLDER_KEY: &str = "YOUR_STABILITY_KEY_HERE";

/// Longest overlay title taken from the description.
const TITLE_MAX_CHARS: usize = 30;

pub struct StabilityImageGenerator {
    http: reqwest::Client,
    config: ImageConfig,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    artifacts: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    base64: String,
}

impl StabilityImageGenerator {
    /// Build from config, reading the key from `config.api_key_env`.
    /// A missing key is not an error here; calls will degrade instead.
    pub fn from_config(config: &ImageConfig) -> Result<Self> {
        let key = std::env::var(&config.api_key_env).ok();
        Self::with_key(config, key)
    }

    pub fn with_key(config: &ImageConfig, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pressroom/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PressroomError::config(format!("http client build: {e}")))?;

        Ok(Self {
            http,
            config: config.clone(),
            api_key,
        })
    }

    fn usable_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY)
    }

    async fn request_image(&self, api_key: &str, prompt: &str) -> std::result::Result<Vec<u8>, String> {
        let url = format!(
            "{}/v1/generation/{}/text-to-image",
            self.config.api_base.trim_end_matches('/'),
            self.config.engine_id
        );
        let body = serde_json::json!({
            "text_prompts": [{ "text": prompt, "weight": 1 }],
            "cfg_scale": self.config.cfg_scale,
            "height": self.config.height,
            "width": self.config.width,
            "samples": 1,
            "steps": self.config.steps,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {text}"));
        }

        let parsed: GenerationResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid response: {e}"))?;
        let first = parsed
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| "response contained no artifacts".to_string())?;
        STANDARD
            .decode(first.base64.as_bytes())
            .map_err(|e| format!("invalid base64 image: {e}"))
    }

    fn write_image(&self, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.config.output_dir.as_path();
        std::fs::create_dir_all(dir).map_err(|e| PressroomError::io(dir, e))?;
        let path = dir.join(format!("cover_{}.png", Utc::now().format("%Y%m%d_%H%M%S_%3f")));
        std::fs::write(&path, bytes).map_err(|e| PressroomError::io(&path, e))?;
        Ok(path)
    }
}

/// First sentence of `description`, cut to at most 30 characters.
pub fn overlay_title(description: &str) -> String {
    let sentence = description.split('.').next().unwrap_or_default();
    sentence
        .trim()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn degraded(message: impl Into<String>) -> Artifact {
    Artifact::degraded(CapabilityKind::ImageGeneration, message)
}

#[async_trait]
impl ImageProvider for StabilityImageGenerator {
    #[instrument(skip_all, fields(engine = %self.config.engine_id))]
    async fn generate_image(&self, request: &ImageRequest) -> Artifact {
        let Some(api_key) = self.usable_key() else {
            warn!(env = %self.config.api_key_env, "image key not configured, skipping generation");
            return degraded(format!(
                "Image generation unavailable: {} is not configured. Simulated image for: {}",
                self.config.api_key_env,
                request.description.trim()
            ));
        };

        let style = request.style.as_deref().unwrap_or(self.config.style.as_str());
        let prompt = format!(
            "{}, {style}, clean composition, high resolution",
            request.description.trim()
        );

        let bytes = match self.request_image(api_key, &prompt).await {
            Ok(bytes) => bytes,
            Err(message) => {
                warn!(%message, "image generation failed");
                return degraded(format!("Image generation API error: {message}"));
            }
        };

        match self.write_image(&bytes) {
            Ok(path) => {
                info!(path = %path.display(), bytes = bytes.len(), "cover image written");
                Artifact::Image {
                    path,
                    title: overlay_title(&request.description),
                    prompt,
                }
            }
            Err(e) => {
                warn!(error = %e, "could not save generated image");
                degraded(format!("Generated image could not be saved: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    fn config_for(api_base: String) -> ImageConfig {
        ImageConfig {
            api_base,
            output_dir: std::env::temp_dir().join(format!("pr-images-{}", uuid::Uuid::now_v7())),
            ..ImageConfig::default()
        }
    }

    fn is_cover_image(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("cover_") && n.ends_with(".png"))
    }

    fn request() -> ImageRequest {
        ImageRequest {
            description: "Agents collaborating on a draft. Warm palette.".into(),
            style: None,
        }
    }

    #[test]
    fn overlay_title_is_first_sentence_capped() {
        assert_eq!(overlay_title("Short one. Another."), "Short one");
        assert_eq!(
            overlay_title("A very long first sentence that keeps going"),
            "A very long first sentence tha"
        );
        assert_eq!(overlay_title(""), "");
    }

    #[tokio::test]
    async fn missing_key_degrades_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for key in [None, Some(String::new()), Some(PLACEHOLDER_KEY.to_string())] {
            let generator = StabilityImageGenerator::with_key(&config_for(server.uri()), key).unwrap();
            let artifact = generator.generate_image(&request()).await;
            assert!(artifact.is_degraded());
            assert!(artifact.render().contains("STABILITY_API_KEY"));
        }
    }

    #[tokio::test]
    async fn non_200_degrades_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generation/stable-diffusion-v1-6/text-to-image"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let generator =
            StabilityImageGenerator::with_key(&config_for(server.uri()), Some("sk-img".into())).unwrap();
        let artifact = generator.generate_image(&request()).await;

        assert!(artifact.is_degraded());
        let text = artifact.render();
        assert!(text.contains("401"));
        assert!(text.contains("invalid api key"));
    }

    #[tokio::test]
    async fn success_writes_decoded_png() {
        let server = MockServer::start().await;
        let png = [0x89u8, b'P', b'N', b'G', 1, 2, 3];
        Mock::given(method("POST"))
            .and(path("/v1/generation/stable-diffusion-v1-6/text-to-image"))
            .and(header("authorization", "Bearer sk-img"))
            .and(body_partial_json(serde_json::json!({ "samples": 1, "steps": 30 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artifacts": [{ "base64": STANDARD.encode(png), "finishReason": "SUCCESS" }]
            })))
            .mount(&server)
            .await;

        let config = config_for(server.uri());
        let generator = StabilityImageGenerator::with_key(&config, Some("sk-img".into())).unwrap();
        let artifact = generator
            .generate_image(&ImageRequest {
                style: Some("flat vector".into()),
                ..request()
            })
            .await;

        match artifact {
            Artifact::Image {
                path,
                title,
                prompt,
            } => {
                assert!(is_cover_image(&path));
                assert!(path.starts_with(&config.output_dir));
                assert_eq!(std::fs::read(&path).unwrap(), png);
                assert_eq!(title, "Agents collaborating on a draf");
                assert!(prompt.contains("flat vector, clean composition"));
            }
            other => panic!("expected image, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&config.output_dir);
    }
}
