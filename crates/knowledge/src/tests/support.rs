//! Shared fixtures: a deterministic embedder and scripted generation backends.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::index::{IndexHandle, PassageIndex};
use crate::rag::RagPipeline;
use crate::types::Chunk;
use askpolicy_core::config::AnswerPolicyConfig;
use askpolicy_core::{AppError, AppResult};
use askpolicy_llm::{
    AnswerGenerator, ExtractiveClient, LivenessProbe, LlmClient, LlmRequest, LlmResponse, LlmUsage,
};
use askpolicy_prompt::default_answer_prompt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMENSIONS: usize = 384;

pub fn trigram_embedder() -> Arc<Embedder> {
    Arc::new(Embedder::with_provider(Arc::new(TrigramProvider::new(DIMENSIONS))))
}

/// Trigram embeddings, except any text containing `FAIL` is an error.
#[derive(Debug)]
pub struct TrippingProvider(TrigramProvider);

impl TrippingProvider {
    pub fn new() -> Self {
        Self(TrigramProvider::new(DIMENSIONS))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrippingProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("FAIL")) {
            return Err(AppError::Knowledge("embedding backend crashed".to_string()));
        }
        self.0.embed_batch(texts).await
    }
}

/// Generation backend with a fixed reply that records what it was asked.
pub struct ScriptedClient {
    reply: Option<String>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl ScriptedClient {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
        match &self.reply {
            Some(reply) => Ok(LlmResponse {
                content: reply.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            None => Err(AppError::Llm("connection refused".to_string())),
        }
    }
}

pub struct FixedProbe(pub bool);

#[async_trait::async_trait]
impl LivenessProbe for FixedProbe {
    async fn is_alive(&self) -> bool {
        self.0
    }

    fn target(&self) -> &str {
        "fixed"
    }
}

/// Primary is down; the real extractive backend answers.
pub fn offline_generator(primary: Arc<ScriptedClient>) -> Arc<AnswerGenerator> {
    Arc::new(AnswerGenerator::new(
        primary,
        Arc::new(FixedProbe(false)),
        Box::new(|| {
            let client: Arc<dyn LlmClient> =
                Arc::new(ExtractiveClient::new(AnswerPolicyConfig::default()));
            Ok(client)
        }),
        "mistral",
        0.0,
    ))
}

/// Primary is up and answers with the scripted client.
pub fn online_generator(primary: Arc<ScriptedClient>) -> Arc<AnswerGenerator> {
    Arc::new(AnswerGenerator::new(
        primary,
        Arc::new(FixedProbe(true)),
        Box::new(|| Err(AppError::ModelUnavailable("fallback not expected".to_string()))),
        "mistral",
        0.0,
    ))
}

/// Neither backend can answer.
pub fn broken_generator() -> Arc<AnswerGenerator> {
    Arc::new(AnswerGenerator::new(
        ScriptedClient::failing(),
        Arc::new(FixedProbe(false)),
        Box::new(|| Err(AppError::ModelUnavailable("weights missing".to_string()))),
        "mistral",
        0.0,
    ))
}

pub fn policy_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("Employees get 20 days annual leave.", "leave.txt", 0),
        Chunk::new("Probation period is 3 months.", "probation.txt", 0),
    ]
}

pub async fn handle_for(chunks: Vec<Chunk>, embedder: Arc<Embedder>) -> Arc<IndexHandle> {
    let index = PassageIndex::build(chunks, embedder).await.unwrap();
    Arc::new(IndexHandle::new(Some(index)))
}

pub fn pipeline(
    index: Arc<IndexHandle>,
    generator: Arc<AnswerGenerator>,
    top_k: usize,
) -> RagPipeline {
    RagPipeline::new(
        index,
        generator,
        default_answer_prompt(),
        AnswerPolicyConfig::default(),
        top_k,
    )
}
