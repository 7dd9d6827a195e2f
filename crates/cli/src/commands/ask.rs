//! Ask command handler.
//!
//! Answers one policy question from the corpus.

use super::corpus::{embedder, load_corpus};
use askpolicy_core::{config::AppConfig, AppError, AppResult};
use askpolicy_knowledge::{
    evaluate, load_or_build, AnswerResult, EvaluationScores, HistoryLog, IndexHandle, RagPipeline,
};
use askpolicy_llm::create_generator;
use askpolicy_prompt::{resolve_prompt, ANSWER_PROMPT_ID};
use clap::Args;
use std::sync::Arc;

/// Ask a question about company policy
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of passages to retrieve (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not record the question in the history log
    #[arg(long)]
    pub no_history: bool,

    /// Score the answer against the retrieved passages
    #[arg(long)]
    pub evaluate: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.question.trim().is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".to_string()));
        }
        let top_k = config.retrieval.resolve_top_k(self.top_k)?;

        let (_, chunks) = load_corpus(config)?;
        let index = load_or_build(&config.index_path(), chunks, embedder(config)).await?;

        let generator = create_generator(&config.generation, &config.answer)?;
        let prompt = resolve_prompt(&config.workspace, ANSWER_PROMPT_ID)?;
        let pipeline = RagPipeline::new(
            Arc::new(IndexHandle::new(index)),
            Arc::new(generator),
            prompt,
            config.answer.clone(),
            top_k,
        );

        let outcome = pipeline.answer(&self.question).await;

        if !self.no_history {
            let answer = outcome.as_ref().ok().map(|r| r.answer_text.as_str());
            let history = HistoryLog::open(&config.history_path())?;
            history.record(self.question.trim(), answer)?;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(stage = e.stage().unwrap_or("RECEIVED"), "Could not answer: {}", e);
                self.print(&AnswerResult::unanswerable(self.question.trim()), None)?;
                return Err(e);
            }
        };

        let scores = self.evaluate.then(|| evaluate(&result));
        self.print(&result, scores.as_ref())
    }

    fn print(&self, result: &AnswerResult, scores: Option<&EvaluationScores>) -> AppResult<()> {
        if self.json {
            let sources: Vec<_> = result
                .source_chunks
                .iter()
                .map(|chunk| {
                    serde_json::json!({
                        "sourceId": chunk.source_id,
                        "position": chunk.position,
                        "content": chunk.content,
                    })
                })
                .collect();

            let mut output = serde_json::json!({
                "question": result.question,
                "answer": result.answer_text,
                "backend": result.backend_used,
                "sources": sources,
            });
            if let Some(scores) = scores {
                output["evaluation"] = serde_json::to_value(scores)?;
            }

            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", result.answer_text);

        if !result.source_chunks.is_empty() {
            println!();
            println!("Sources:");
            for (i, chunk) in result.source_chunks.iter().enumerate() {
                println!("  [{}] {} (chunk {})", i + 1, chunk.source_id, chunk.position);
            }
        }

        if let Some(scores) = scores {
            println!();
            println!("Evaluation:");
            println!("  ROUGE-L F1: {:.3}", scores.rouge_l_f1);
            println!("  BLEU:       {:.3}", scores.bleu);
        }

        tracing::debug!("Answered via {} backend", result.backend_used);
        Ok(())
    }
}
