//! Answer Generator: one generation capability over two backends.
//!
//! The preferred backend is used whenever its liveness probe succeeds. The
//! fallback backend is built by a loader the first time it is needed and the
//! instance is shared by every later call. Concurrent first callers wait on
//! the same initialization instead of loading twice.

use crate::client::{Grounding, LlmClient, LlmRequest};
use crate::probe::LivenessProbe;
use crate::types::{BackendKind, Generation};
use askpolicy_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Builds the fallback backend on first use.
pub type FallbackLoader = Box<dyn Fn() -> AppResult<Arc<dyn LlmClient>> + Send + Sync>;

pub struct AnswerGenerator {
    primary: Arc<dyn LlmClient>,
    probe: Arc<dyn LivenessProbe>,
    fallback: OnceCell<Arc<dyn LlmClient>>,
    fallback_loader: FallbackLoader,
    model: String,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(
        primary: Arc<dyn LlmClient>,
        probe: Arc<dyn LivenessProbe>,
        fallback_loader: FallbackLoader,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            primary,
            probe,
            fallback: OnceCell::new(),
            fallback_loader,
            model: model.into(),
            temperature,
        }
    }

    /// Model name sent to the preferred backend.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the fallback backend has been loaded yet.
    pub fn fallback_loaded(&self) -> bool {
        self.fallback.initialized()
    }

    /// Generate raw text for a constrained prompt.
    ///
    /// Returns [`AppError::GenerationUnavailable`] only when neither backend
    /// produced an answer.
    pub async fn generate(&self, prompt: &str) -> AppResult<Generation> {
        let request = LlmRequest::new(prompt, self.model.clone()).with_temperature(self.temperature);
        self.run(&request).await
    }

    /// Generate for a prompt rendered from `grounding`.
    ///
    /// The context and question travel with the request so a backend never
    /// has to recover them from the prompt text.
    pub async fn generate_grounded(&self, prompt: &str, grounding: Grounding) -> AppResult<Generation> {
        let request = LlmRequest::new(prompt, self.model.clone())
            .with_temperature(self.temperature)
            .with_grounding(grounding);
        self.run(&request).await
    }

    async fn run(&self, request: &LlmRequest) -> AppResult<Generation> {

        let primary_error = if self.probe.is_alive().await {
            match self.primary.complete(request).await {
                Ok(response) => {
                    tracing::debug!(backend = self.primary.provider_name(), "Generated with primary backend");
                    return Ok(Generation::new(response.content, BackendKind::Primary));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Primary backend failed, using fallback");
                    e.to_string()
                }
            }
        } else {
            tracing::info!(probe = self.probe.target(), "Primary backend unreachable, using fallback");
            format!("{} unreachable", self.probe.target())
        };

        let fallback = self.fallback().await.map_err(|e| {
            AppError::GenerationUnavailable(format!("primary: {}; fallback: {}", primary_error, e))
        })?;

        match fallback.complete(request).await {
            Ok(response) => {
                tracing::debug!(backend = fallback.provider_name(), "Generated with fallback backend");
                Ok(Generation::new(response.content, BackendKind::Fallback))
            }
            Err(e) => Err(AppError::GenerationUnavailable(format!(
                "primary: {}; fallback: {}",
                primary_error, e
            ))),
        }
    }

    async fn fallback(&self) -> AppResult<&Arc<dyn LlmClient>> {
        self.fallback
            .get_or_try_init(|| async {
                tracing::info!("Loading fallback generation backend");
                (self.fallback_loader)()
            })
            .await
    }
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("primary", &self.primary.provider_name())
            .field("probe", &self.probe.target())
            .field("fallback_loaded", &self.fallback_loaded())
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmResponse, LlmUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClient {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl LlmClient for FakeClient {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Llm(format!("{} is down", self.name)));
            }
            let input = match &request.grounding {
                Some(grounding) => grounding.question.as_str(),
                None => request.prompt.as_str(),
            };
            Ok(LlmResponse {
                content: format!("{}: {}", self.name, input),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    struct FakeProbe(bool);

    #[async_trait::async_trait]
    impl LivenessProbe for FakeProbe {
        async fn is_alive(&self) -> bool {
            self.0
        }

        fn target(&self) -> &str {
            "fake"
        }
    }

    struct Harness {
        generator: AnswerGenerator,
        primary_calls: Arc<AtomicUsize>,
        fallback_calls: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
    }

    fn harness(alive: bool, primary_fails: bool, fallback_fails: bool) -> Harness {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let loads = Arc::new(AtomicUsize::new(0));

        let primary = Arc::new(FakeClient {
            name: "primary",
            fail: primary_fails,
            calls: primary_calls.clone(),
        });

        let loader_calls = fallback_calls.clone();
        let loader_loads = loads.clone();
        let loader: FallbackLoader = Box::new(move || {
            loader_loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeClient {
                name: "fallback",
                fail: fallback_fails,
                calls: loader_calls.clone(),
            }) as Arc<dyn LlmClient>)
        });

        Harness {
            generator: AnswerGenerator::new(primary, Arc::new(FakeProbe(alive)), loader, "mistral", 0.0),
            primary_calls,
            fallback_calls,
            loads,
        }
    }

    #[tokio::test]
    async fn test_healthy_primary_never_loads_fallback() {
        let h = harness(true, false, false);
        let generation = h.generator.generate("prompt").await.unwrap();

        assert_eq!(generation.backend, BackendKind::Primary);
        assert_eq!(generation.text, "primary: prompt");
        assert_eq!(h.primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.loads.load(Ordering::SeqCst), 0);
        assert!(!h.generator.fallback_loaded());
    }

    #[tokio::test]
    async fn test_unreachable_primary_uses_fallback_loaded_once() {
        let h = harness(false, false, false);

        for _ in 0..3 {
            let generation = h.generator.generate("prompt").await.unwrap();
            assert_eq!(generation.backend, BackendKind::Fallback);
            assert_eq!(generation.text, "fallback: prompt");
        }

        assert_eq!(h.primary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.fallback_calls.load(Ordering::SeqCst), 3);
        assert_eq!(h.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_fallback_once() {
        let h = Arc::new(harness(false, false, false));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let h = h.clone();
                tokio::spawn(async move { h.generator.generate("prompt").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(h.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_grounding_reaches_fallback() {
        let h = harness(false, false, false);
        let generation = h
            .generator
            .generate_grounded("prompt", Grounding::new("Leave is 20 days.", "How much leave?"))
            .await
            .unwrap();

        assert_eq!(generation.backend, BackendKind::Fallback);
        assert_eq!(generation.text, "fallback: How much leave?");
    }

    #[tokio::test]
    async fn test_failing_primary_falls_through() {
        let h = harness(true, true, false);
        let generation = h.generator.generate("prompt").await.unwrap();

        assert_eq!(generation.backend, BackendKind::Fallback);
        assert_eq!(h.primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_backends_failing() {
        let h = harness(false, false, true);
        let err = h.generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, AppError::GenerationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fallback_load_failure_is_generation_unavailable() {
        let loader: FallbackLoader =
            Box::new(|| Err(AppError::ModelUnavailable("no weights".to_string())));
        let generator = AnswerGenerator::new(
            Arc::new(FakeClient {
                name: "primary",
                fail: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            Arc::new(FakeProbe(false)),
            loader,
            "mistral",
            0.0,
        );

        let err = generator.generate("prompt").await.unwrap_err();
        match err {
            AppError::GenerationUnavailable(msg) => assert!(msg.contains("no weights")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!generator.fallback_loaded());
    }
}
