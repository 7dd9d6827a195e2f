//! Insights command handler.
//!
//! Clusters recently asked questions into the most frequent FAQs.

use super::corpus::embedder;
use askpolicy_core::{config::AppConfig, AppError, AppResult};
use askpolicy_knowledge::{faq_insights, HistoryLog, SimilarityClusterer};
use clap::Args;

/// Show the most frequently asked questions
#[derive(Args, Debug)]
pub struct InsightsCommand {
    /// Number of clusters to show (default: insights.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Cosine similarity needed to merge two questions (default: insights.similarityThreshold)
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Number of recent questions to consider (default: insights.historyLimit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InsightsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing insights command");

        let threshold = self.threshold.unwrap_or(config.insights.similarity_threshold);
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(AppError::InvalidInput(format!(
                "threshold must be within [-1, 1], got {}",
                threshold
            )));
        }
        let top_k = self.top_k.unwrap_or(config.insights.top_k);
        let limit = self.limit.unwrap_or(config.insights.history_limit);

        let history = HistoryLog::open(&config.history_path())?;
        let clusterer = SimilarityClusterer::new(embedder(config), threshold, top_k);
        let clusters = faq_insights(&history, &clusterer, limit).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&clusters)?);
            return Ok(());
        }

        if clusters.is_empty() {
            println!("No questions asked yet.");
            return Ok(());
        }

        println!("Top asked questions:");
        for (i, cluster) in clusters.iter().enumerate() {
            println!(
                "  {}. {} ({} asked)",
                i + 1,
                cluster.representative_question,
                cluster.member_count
            );
        }

        Ok(())
    }
}
