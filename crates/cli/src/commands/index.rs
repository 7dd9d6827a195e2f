//! Index command handler.
//!
//! Builds and inspects the persisted Passage Index.

use super::corpus::{embedder, load_corpus};
use askpolicy_core::{config::AppConfig, AppError, AppResult};
use askpolicy_knowledge::{load_or_build, rebuild, PassageIndex};
use clap::{Args, Subcommand};
use std::time::Instant;

/// Passage index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Build the index from the corpus directory
    Build(IndexBuildCommand),
    /// Show the persisted index
    Status(IndexStatusCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Status(cmd) => cmd.execute(config),
        }
    }
}

/// Build the index
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Rebuild even if the persisted index matches the corpus
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index build command (force: {})", self.force);
        let start = Instant::now();

        let (documents, chunks) = load_corpus(config)?;
        let path = config.index_path();

        let index = if self.force {
            if chunks.is_empty() {
                return Err(AppError::EmptyCorpus);
            }
            Some(rebuild(&path, chunks, embedder(config)).await?)
        } else {
            load_or_build(&path, chunks, embedder(config)).await?
        };

        let entries = index.as_ref().map_or(0, PassageIndex::len);
        let duration = start.elapsed();

        if self.json {
            let output = serde_json::json!({
                "path": path,
                "documents": documents.len(),
                "entries": entries,
                "durationSecs": duration.as_secs_f64(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if index.is_none() {
            println!(
                "No documents found in {:?}; nothing to index",
                config.data_dir()
            );
        } else {
            println!(
                "Indexed {} documents ({} passages) in {:.2}s",
                documents.len(),
                entries,
                duration.as_secs_f64()
            );
            println!("Index: {}", path.display());
        }

        Ok(())
    }
}

/// Show index status
#[derive(Args, Debug)]
pub struct IndexStatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatusCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index status command");

        let path = config.index_path();
        if !path.exists() {
            return Err(AppError::Knowledge(format!(
                "No index at {}. Run 'askpolicy index build' first.",
                path.display()
            )));
        }

        let status = PassageIndex::status(&path)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("Index: {}", status.path.display());
            println!("  Entries:     {}", status.entries);
            println!("  Dimensions:  {}", status.dimensions);
            println!("  Model:       {}", status.model);
            println!("  Fingerprint: {}", status.fingerprint);
        }

        Ok(())
    }
}
