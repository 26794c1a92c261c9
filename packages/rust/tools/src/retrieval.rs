//! Retrieval backed by the [`KnowledgeStore`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use pressroom_knowledge::{KnowledgeStore, is_uninitialized};

use crate::{Artifact, CapabilityKind, RetrievalProvider, RetrievalRequest};

pub struct KnowledgeRetriever {
    store: Arc<KnowledgeStore>,
}

impl KnowledgeRetriever {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetrievalProvider for KnowledgeRetriever {
    async fn retrieve(&self, request: &RetrievalRequest) -> Artifact {
        info!(query = %request.query, k = request.k, "searching knowledge base");
        let context = self.store.query(&request.query, request.k).await;

        if is_uninitialized(&context) || context.trim().is_empty() {
            warn!(query = %request.query, "no knowledge base context, falling back to general knowledge");
            return Artifact::degraded(
                CapabilityKind::Retrieval,
                format!(
                    "Notice: no specific information about '{}' was found in the local \
                     knowledge base. Use your general knowledge to write the best possible \
                     content while keeping the brand's tone of voice.",
                    request.query
                ),
            );
        }

        Artifact::Context {
            query: request.query.clone(),
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_llm::testing::{KeywordEmbedder, ScriptedGenerator};
    use pressroom_shared::KnowledgeConfig;

    fn store_in(root: &std::path::Path) -> Arc<KnowledgeStore> {
        let config = KnowledgeConfig {
            corpus_dir: root.join("corpus"),
            persist_dir: root.join("index"),
            ..KnowledgeConfig::default()
        };
        let generator = Arc::new(ScriptedGenerator::new(|_| Ok(String::new())));
        Arc::new(KnowledgeStore::new(config, Arc::new(KeywordEmbedder::new(32)), generator).unwrap())
    }

    #[tokio::test]
    async fn uninitialized_store_yields_advisory() {
        let root = std::env::temp_dir().join(format!("pr-retrieval-{}", uuid::Uuid::now_v7()));
        let retriever = KnowledgeRetriever::new(store_in(&root));

        let artifact = retriever
            .retrieve(&RetrievalRequest {
                query: "Edge caching".into(),
                k: 3,
            })
            .await;

        assert!(artifact.is_degraded());
        let text = artifact.render();
        assert!(text.contains("'Edge caching'"));
        assert!(text.contains("general knowledge"));
    }

    #[tokio::test]
    async fn indexed_store_yields_context() {
        let root = std::env::temp_dir().join(format!("pr-retrieval-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(root.join("corpus")).unwrap();
        std::fs::write(root.join("corpus/cache.md"), "edge caching keeps latency low").unwrap();

        let store = store_in(&root);
        store.load_and_index().await.unwrap();
        let artifact = KnowledgeRetriever::new(store)
            .retrieve(&RetrievalRequest {
                query: "edge caching".into(),
                k: 3,
            })
            .await;

        match artifact {
            Artifact::Context { query, context } => {
                assert_eq!(query, "edge caching");
                assert_eq!(context, "edge caching keeps latency low");
            }
            other => panic!("expected context, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&root);
    }
}
