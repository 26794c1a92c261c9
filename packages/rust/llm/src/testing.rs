//! Offline capability implementations for tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use pressroom_shared::{PressroomError, Result};

use crate::{Embedder, Embedding, GenerationRequest, TextGenerator};

/// Bag-of-words embedder: each lowercase word increments a hashed bucket,
/// and the vector is L2-normalised. Texts sharing words land close together.
pub struct KeywordEmbedder {
    dim: usize,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, fail: false }
    }

    /// An embedder whose every call fails, standing in for an unreachable service.
    pub fn unavailable() -> Self {
        Self { dim: 1, fail: true }
    }

    fn vector(&self, text: &str) -> Embedding {
        let mut v = vec![0.0_f32; self.dim];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % self.dim as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if self.fail {
            return Err(PressroomError::Embedding("embedding service unreachable".into()));
        }
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Generator driven by a closure; records every request it receives.
pub struct ScriptedGenerator<F> {
    respond: F,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl<F> ScriptedGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<String> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl<F> TextGenerator for ScriptedGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<String> + Send + Sync,
{
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        (self.respond)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keyword_embedder_is_deterministic_and_normalised() {
        let embedder = KeywordEmbedder::new(16);
        let a = embedder.embed("vector index").await.unwrap();
        let b = embedder.embed("Vector Index").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn scripted_generator_records_calls() {
        let generator = ScriptedGenerator::new(|req| Ok(format!("echo: {}", req.instructions)));
        let out = generator
            .generate(&GenerationRequest::prompt("ping"))
            .await
            .unwrap();
        assert_eq!(out, "echo: ping");
        assert_eq!(generator.calls().len(), 1);
    }
}
