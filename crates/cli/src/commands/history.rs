//! History command handler.
//!
//! Lists recently asked questions with their recorded answers.

use askpolicy_core::{config::AppConfig, AppError, AppResult};
use askpolicy_knowledge::HistoryLog;
use clap::Args;

/// List recently asked questions
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// Number of records to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing history command");

        if self.limit == 0 {
            return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
        }

        let history = HistoryLog::open(&config.history_path())?;
        let records = history.recent_records(self.limit)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("No questions asked yet.");
            return Ok(());
        }

        for record in &records {
            println!(
                "[{}] {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.question
            );
            match &record.answer {
                Some(answer) => println!("    {}", answer),
                None => println!("    (no answer)"),
            }
        }

        Ok(())
    }
}
