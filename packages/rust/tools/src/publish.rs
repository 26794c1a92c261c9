//! Simulated WordPress publishing.
//!
//! Nothing leaves the process: the publisher records a draft and returns a
//! preview reference built from the configured site URL.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use pressroom_shared::PublishingConfig;

use crate::{Artifact, PublishRequest, PublishingProvider};

/// Lowercase `title` and collapse every run of non-alphanumerics to `-`.
pub fn slugify(title: &str) -> String {
    static NON_SLUG: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

    let lower = title.to_lowercase();
    NON_SLUG.replace_all(&lower, "-").trim_matches('-').to_string()
}

pub struct SimulatedPublisher {
    site_url: String,
}

impl SimulatedPublisher {
    pub fn new(config: &PublishingConfig) -> Self {
        Self {
            site_url: config.site_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PublishingProvider for SimulatedPublisher {
    async fn publish(&self, request: &PublishRequest) -> Artifact {
        let slug = slugify(&request.title);
        let reference = format!("{}/preview/{slug}-draft", self.site_url);
        info!(title = %request.title, %reference, chars = request.content.len(), "draft recorded");

        Artifact::Publication {
            status: "draft".into(),
            reference,
            title: request.title.clone(),
            metadata: request.metadata.clone(),
        }
    }
}
