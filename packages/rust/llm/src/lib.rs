//! Generation and embedding capabilities.
//!
//! Both are external, network-backed services. The traits here are the
//! boundary the rest of pressroom programs against; [`OpenAiClient`] is the
//! production implementation for any OpenAI-compatible endpoint.

pub mod openai;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use async_trait::async_trait;
use pressroom_shared::Result;

pub use openai::OpenAiClient;

/// A vector embedding (f32 components).
pub type Embedding = Vec<f32>;

/// Input to a single generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Role label the model should assume (e.g. "Senior Content Strategist").
    pub role: String,
    /// Free-text task instructions.
    pub instructions: String,
    /// Rendered upstream context; may be empty.
    pub context: String,
    /// Description of the output the caller expects.
    pub expected_output: String,
}

impl GenerationRequest {
    /// A bare prompt with no role, context or output description.
    pub fn prompt(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Default::default()
        }
    }

    /// The user-turn text sent to the model.
    pub fn user_message(&self) -> String {
        let mut message = self.instructions.trim().to_string();
        if !self.context.trim().is_empty() {
            message.push_str("\n\n# Context\n\n");
            message.push_str(self.context.trim());
        }
        if !self.expected_output.trim().is_empty() {
            message.push_str("\n\n# Expected output\n\n");
            message.push_str(self.expected_output.trim());
        }
        message
    }
}

/// Free-form text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce text for the request. Errors are the caller's to handle.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Text-to-vector embedding.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text string.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_includes_sections_in_order() {
        let request = GenerationRequest {
            role: "Editor".into(),
            instructions: "Tighten the draft.".into(),
            context: "## Draft\nSome text".into(),
            expected_output: "A refined draft.".into(),
        };
        let msg = request.user_message();
        let ctx = msg.find("# Context").unwrap();
        let out = msg.find("# Expected output").unwrap();
        assert!(msg.starts_with("Tighten the draft."));
        assert!(ctx < out);
    }

    #[test]
    fn bare_prompt_has_no_sections() {
        let msg = GenerationRequest::prompt("List five topics.").user_message();
        assert_eq!(msg, "List five topics.");
    }
}
