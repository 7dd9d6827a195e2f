//! Backend factory.
//!
//! Turns configuration into concrete generation backends and wires them into
//! an [`AnswerGenerator`].

use crate::client::LlmClient;
use crate::generator::{AnswerGenerator, FallbackLoader};
use crate::probe::HttpProbe;
use crate::providers::{ExtractiveClient, OllamaClient};
use askpolicy_core::config::{AnswerPolicyConfig, GenerationConfig};
use askpolicy_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a generation backend by name.
///
/// # Arguments
/// * `provider` - Backend identifier ("ollama" or "extractive")
/// * `generation` - Endpoint and timeout settings
/// * `policy` - Answer policies used by in-process backends
///
/// # Errors
/// Returns [`AppError::Config`] for an unknown backend name.
pub fn create_client(
    provider: &str,
    generation: &GenerationConfig,
    policy: &AnswerPolicyConfig,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let client = OllamaClient::with_base_url(
                generation.endpoint.as_str(),
                Duration::from_secs(generation.request_timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
        "extractive" => Ok(Arc::new(ExtractiveClient::new(policy.clone()))),
        _ => Err(AppError::Config(format!(
            "Unknown generation backend: {}",
            provider
        ))),
    }
}

/// Build the Answer Generator: Ollama as the preferred backend, probed at
/// `{endpoint}/api/tags`, with the configured fallback loaded on first use.
pub fn create_generator(
    generation: &GenerationConfig,
    policy: &AnswerPolicyConfig,
) -> AppResult<AnswerGenerator> {
    let primary = create_client("ollama", generation, policy)?;
    let probe = HttpProbe::new(
        &generation.endpoint,
        Duration::from_secs(generation.probe_timeout_secs),
    )?;

    let fallback_name = generation.fallback.clone();
    let fallback_generation = generation.clone();
    let fallback_policy = policy.clone();
    let loader: FallbackLoader = Box::new(move || {
        create_client(&fallback_name, &fallback_generation, &fallback_policy)
            .map_err(|e| AppError::ModelUnavailable(e.to_string()))
    });

    tracing::debug!(
        endpoint = %generation.endpoint,
        model = %generation.model,
        fallback = %generation.fallback,
        "Answer generator configured"
    );

    Ok(AnswerGenerator::new(
        primary,
        Arc::new(probe),
        loader,
        generation.model.clone(),
        generation.temperature,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendKind;

    #[test]
    fn test_create_known_clients() {
        let generation = GenerationConfig::default();
        let policy = AnswerPolicyConfig::default();

        let ollama = create_client("ollama", &generation, &policy).unwrap();
        assert_eq!(ollama.provider_name(), "ollama");

        let extractive = create_client("Extractive", &generation, &policy).unwrap();
        assert_eq!(extractive.provider_name(), "extractive");
    }

    #[test]
    fn test_unknown_client() {
        let result = create_client(
            "gguf",
            &GenerationConfig::default(),
            &AnswerPolicyConfig::default(),
        );
        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown generation backend")),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected error for unknown backend"),
        }
    }

    #[tokio::test]
    async fn test_generator_falls_back_when_service_is_down() {
        let generation = GenerationConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            probe_timeout_secs: 1,
            ..GenerationConfig::default()
        };
        let generator = create_generator(&generation, &AnswerPolicyConfig::default()).unwrap();

        let result = generator
            .generate("Context:\nSick leave is 10 days.\n\nQuestion:\nHow many sick days?")
            .await
            .unwrap();

        assert_eq!(result.backend, BackendKind::Fallback);
        assert_eq!(result.text, "Sick leave is 10 days.");
    }
}
