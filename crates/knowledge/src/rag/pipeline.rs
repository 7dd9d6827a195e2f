//! Retrieval-augmented answering.
//!
//! One query moves through `RECEIVED -> RETRIEVED -> CONTEXT_BUILT ->
//! GENERATED -> RETURNED`. A failure after RECEIVED is wrapped with the name
//! of the stage it escaped from. Nothing is retried and nothing is kept
//! between queries.

use crate::context;
use crate::index::IndexHandle;
use crate::types::{AnswerResult, Chunk, PipelineStage};
use askpolicy_core::config::AnswerPolicyConfig;
use askpolicy_core::{AppError, AppResult};
use askpolicy_llm::providers::is_greeting;
use askpolicy_llm::{AnswerGenerator, BackendKind, Grounding};
use askpolicy_prompt::{build_answer_prompt, PromptDefinition};
use std::sync::Arc;

/// Answers questions from the active Passage Index.
#[derive(Debug)]
pub struct RagPipeline {
    index: Arc<IndexHandle>,
    generator: Arc<AnswerGenerator>,
    prompt: PromptDefinition,
    policy: AnswerPolicyConfig,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        index: Arc<IndexHandle>,
        generator: Arc<AnswerGenerator>,
        prompt: PromptDefinition,
        policy: AnswerPolicyConfig,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            generator,
            prompt,
            policy,
            top_k,
        }
    }

    /// Number of passages retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer one question.
    ///
    /// An empty question is rejected with [`AppError::InvalidInput`] before
    /// any stage runs. Later failures come back as [`AppError::Pipeline`].
    pub async fn answer(&self, question: &str) -> AppResult<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".to_string()));
        }
        tracing::debug!(stage = %PipelineStage::Received, question, "Pipeline stage");

        if is_greeting(question, &self.policy.greetings) {
            tracing::info!("Greeting detected, answering without retrieval");
            return Ok(self.policy_answer(question, &self.policy.greeting_response, Vec::new()));
        }

        let chunks = self
            .index
            .query(question, self.top_k)
            .await
            .map_err(|e| fail(PipelineStage::Retrieved, e))?;
        tracing::debug!(
            stage = %PipelineStage::Retrieved,
            chunks = chunks.len(),
            "Pipeline stage"
        );

        let context = context::assemble(&chunks);
        tracing::debug!(
            stage = %PipelineStage::ContextBuilt,
            chars = context.len(),
            "Pipeline stage"
        );

        if context.trim().is_empty() {
            tracing::info!("No context retrieved, answering with the not-specified response");
            return Ok(self.policy_answer(question, &self.policy.not_specified_response, chunks));
        }

        let built = build_answer_prompt(&self.prompt, question, &context, &self.policy)
            .map_err(|e| fail(PipelineStage::Generated, e))?;
        let prompt = match built.system {
            Some(system) => format!("{}\n\n{}", system, built.user),
            None => built.user,
        };

        let generation = self
            .generator
            .generate_grounded(&prompt, Grounding::new(context, question))
            .await
            .map_err(|e| fail(PipelineStage::Generated, e))?;
        tracing::debug!(
            stage = %PipelineStage::Generated,
            backend = %generation.backend,
            "Pipeline stage"
        );

        let result = AnswerResult {
            question: question.to_string(),
            answer_text: generation.text.trim().to_string(),
            source_chunks: chunks,
            backend_used: generation.backend,
        };
        tracing::info!(
            stage = %PipelineStage::Returned,
            backend = %result.backend_used,
            sources = result.source_chunks.len(),
            "Answered question"
        );

        Ok(result)
    }

    fn policy_answer(&self, question: &str, text: &str, chunks: Vec<Chunk>) -> AnswerResult {
        AnswerResult {
            question: question.to_string(),
            answer_text: text.trim().to_string(),
            source_chunks: chunks,
            backend_used: BackendKind::Policy,
        }
    }
}

fn fail(stage: PipelineStage, err: AppError) -> AppError {
    tracing::warn!(stage = %stage, next = %PipelineStage::Failed, "Pipeline failed: {}", err);
    AppError::at_stage(stage.as_str(), err)
}
