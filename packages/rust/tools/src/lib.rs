//! Fail-soft external capabilities invoked by pipeline stages.
//!
//! Every capability converts its own failures (missing credentials, HTTP
//! errors, empty results) into an [`Artifact::Degraded`], so
//! [`ToolInvocationLayer::invoke`] always returns a well-formed artifact.

pub mod artifact;
pub mod image;
pub mod publish;
pub mod retrieval;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use artifact::{Artifact, CapabilityKind};
pub use image::StabilityImageGenerator;
pub use publish::SimulatedPublisher;
pub use retrieval::KnowledgeRetriever;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    pub k: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub description: String,
    /// Overrides the configured style when set.
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    pub metadata: String,
}

/// One typed request per capability kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Retrieval(RetrievalRequest),
    ImageGeneration(ImageRequest),
    Publishing(PublishRequest),
}

impl ToolRequest {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Retrieval(_) => CapabilityKind::Retrieval,
            Self::ImageGeneration(_) => CapabilityKind::ImageGeneration,
            Self::Publishing(_) => CapabilityKind::Publishing,
        }
    }
}

#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    async fn retrieve(&self, request: &RetrievalRequest) -> Artifact;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate_image(&self, request: &ImageRequest) -> Artifact;
}

#[async_trait]
pub trait PublishingProvider: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Artifact;
}

/// Dispatches tool requests to the configured providers.
#[derive(Clone)]
pub struct ToolInvocationLayer {
    retrieval: Arc<dyn RetrievalProvider>,
    image: Arc<dyn ImageProvider>,
    publisher: Arc<dyn PublishingProvider>,
}

impl ToolInvocationLayer {
    pub fn new(
        retrieval: Arc<dyn RetrievalProvider>,
        image: Arc<dyn ImageProvider>,
        publisher: Arc<dyn PublishingProvider>,
    ) -> Self {
        Self {
            retrieval,
            image,
            publisher,
        }
    }

    /// Run a request against its capability. Never fails.
    pub async fn invoke(&self, request: ToolRequest) -> Artifact {
        let kind = request.kind();
        debug!(capability = %kind, "invoking tool");

        let artifact = match &request {
            ToolRequest::Retrieval(req) => self.retrieval.retrieve(req).await,
            ToolRequest::ImageGeneration(req) => self.image.generate_image(req).await,
            ToolRequest::Publishing(req) => self.publisher.publish(req).await,
        };

        if artifact.is_degraded() {
            warn!(capability = %kind, "tool returned a degraded result");
        }
        artifact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Artifact);

    #[async_trait]
    impl RetrievalProvider for Fixed {
        async fn retrieve(&self, _: &RetrievalRequest) -> Artifact {
            self.0.clone()
        }
    }

    #[async_trait]
    impl ImageProvider for Fixed {
        async fn generate_image(&self, _: &ImageRequest) -> Artifact {
            self.0.clone()
        }
    }

    #[async_trait]
    impl PublishingProvider for Fixed {
        async fn publish(&self, _: &PublishRequest) -> Artifact {
            self.0.clone()
        }
    }

    fn layer() -> ToolInvocationLayer {
        ToolInvocationLayer::new(
            Arc::new(Fixed(Artifact::Context {
                query: "q".into(),
                context: "c".into(),
            })),
            Arc::new(Fixed(Artifact::degraded(CapabilityKind::ImageGeneration, "no key"))),
            Arc::new(SimulatedPublisher::new(&pressroom_shared::PublishingConfig::default())),
        )
    }

    #[tokio::test]
    async fn dispatches_by_kind() {
        let tools = layer();

        let retrieved = tools
            .invoke(ToolRequest::Retrieval(RetrievalRequest {
                query: "q".into(),
                k: 3,
            }))
            .await;
        assert!(matches!(retrieved, Artifact::Context { .. }));

        let image = tools
            .invoke(ToolRequest::ImageGeneration(ImageRequest {
                description: "d".into(),
                style: None,
            }))
            .await;
        assert!(matches!(
            image,
            Artifact::Degraded {
                capability: CapabilityKind::ImageGeneration,
                ..
            }
        ));

        let published = tools
            .invoke(ToolRequest::Publishing(PublishRequest {
                title: "Hello".into(),
                content: "Body".into(),
                metadata: String::new(),
            }))
            .await;
        assert!(matches!(published, Artifact::Publication { .. }));
    }

    #[test]
    fn request_kind_matches_variant() {
        let request = ToolRequest::Publishing(PublishRequest {
            title: String::new(),
            content: String::new(),
            metadata: String::new(),
        });
        assert_eq!(request.kind(), CapabilityKind::Publishing);
    }
}
