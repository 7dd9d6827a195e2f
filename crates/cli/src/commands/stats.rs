//! Stats command handler.
//!
//! Corpus statistics and frequent terms.

use super::corpus::load_corpus;
use askpolicy_core::{config::AppConfig, AppResult};
use askpolicy_knowledge::{document_stats, frequent_terms};
use clap::Args;

/// Show corpus statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Number of frequent terms to list
    #[arg(short, long, default_value = "10")]
    pub terms: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");
        tracing::debug!("Stats options: {:?}", self);

        let (documents, chunks) = load_corpus(config)?;
        let stats = document_stats(&documents, &chunks);
        let terms = frequent_terms(&chunks, self.terms);

        if self.json {
            let output = serde_json::json!({
                "numDocuments": stats.num_documents,
                "numChunks": stats.num_chunks,
                "totalWords": stats.total_words,
                "frequentTerms": terms
                    .iter()
                    .map(|(term, count)| serde_json::json!({ "term": term, "count": count }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Documents: {}", stats.num_documents);
        println!("Chunks:    {}", stats.num_chunks);
        println!("Words:     {}", stats.total_words);

        if !terms.is_empty() {
            println!();
            println!("Frequent terms:");
            for (term, count) in &terms {
                println!("  {:<20} {}", term, count);
            }
        }

        Ok(())
    }
}
