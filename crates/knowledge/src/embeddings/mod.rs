//! Embedder: turns text into fixed-dimension vectors.
//!
//! The provider behind an [`Embedder`] is created on first use and shared by
//! every later call. Concurrent first callers wait on a single load.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use askpolicy_core::config::EmbeddingConfig;
use askpolicy_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct Embedder {
    config: EmbeddingConfig,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl Embedder {
    /// Create an embedder that loads its provider lazily from `config`.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    /// Create an embedder around an already loaded provider.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let config = EmbeddingConfig {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
            ..EmbeddingConfig::default()
        };

        Self {
            config,
            provider: OnceCell::new_with(Some(provider)),
        }
    }

    /// Vector dimension produced by this embedder.
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Identity of the model; vectors are only comparable within one identity.
    pub fn model_id(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.model)
    }

    /// Whether the provider has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.provider.initialized()
    }

    async fn provider(&self) -> AppResult<&Arc<dyn EmbeddingProvider>> {
        self.provider
            .get_or_try_init(|| async {
                tracing::info!(
                    provider = %self.config.provider,
                    model = %self.config.model,
                    dimensions = self.config.dimensions,
                    "Loading embedding model"
                );
                create_provider(&self.config).await.map_err(|e| match e {
                    AppError::ModelUnavailable(_) => e,
                    other => AppError::ModelUnavailable(other.to_string()),
                })
            })
            .await
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }

    /// Embed many texts; output order matches input order.
    pub async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.provider().await?;
        let vectors = provider.embed_batch(texts).await?;

        if vectors.len() != texts.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions()) {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} dimensions, expected {}",
                bad.len(),
                self.dimensions()
            )));
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            vectors.len(),
            self.dimensions()
        );

        Ok(vectors)
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.model_id())
            .field("dimensions", &self.config.dimensions)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::TrigramProvider;

    #[tokio::test]
    async fn test_lazy_load_on_first_use() {
        let embedder = Embedder::new(EmbeddingConfig::default());
        assert!(!embedder.is_loaded());

        let vector = embedder.embed("annual leave").await.unwrap();
        assert_eq!(vector.len(), 384);
        assert!(embedder.is_loaded());
    }

    #[tokio::test]
    async fn test_concurrent_first_use_shares_one_provider() {
        let embedder = Arc::new(Embedder::new(EmbeddingConfig::default()));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let embedder = embedder.clone();
                tokio::spawn(async move { embedder.embed(&format!("question {}", i)).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        let first = embedder.provider().await.unwrap().clone();
        let second = embedder.provider().await.unwrap().clone();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_load_failure_is_model_unavailable() {
        let embedder = Embedder::new(EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        });

        let err = embedder.embed("leave").await.unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
        assert!(!embedder.is_loaded());
    }

    #[tokio::test]
    async fn test_injected_provider() {
        let embedder = Embedder::with_provider(Arc::new(TrigramProvider::new(64)));
        assert!(embedder.is_loaded());
        assert_eq!(embedder.dimensions(), 64);
        assert_eq!(embedder.model_id(), "trigram/trigram-v1");

        let vectors = embedder
            .embed_batch(&["a policy".to_string(), "another policy".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 64));
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_load() {
        let embedder = Embedder::new(EmbeddingConfig::default());
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert!(!embedder.is_loaded());
    }
}
