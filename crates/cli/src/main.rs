//! AskPolicy CLI
//!
//! Main entry point for the askpolicy command-line tool.
//! Answers HR policy questions from a local document corpus and reports
//! the most frequently asked questions.

mod commands;

use askpolicy_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, HistoryCommand, IndexCommand, InsightsCommand, StatsCommand};
use std::path::PathBuf;

/// AskPolicy CLI - HR policy answers grounded in your own documents
#[derive(Parser, Debug)]
#[command(name = "askpolicy")]
#[command(about = "HR policy question answering over a local corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASKPOLICY_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASKPOLICY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Generation model served by Ollama
    #[arg(short, long, global = true, env = "ASKPOLICY_MODEL")]
    model: Option<String>,

    /// Base URL of the Ollama service
    #[arg(long, global = true, env = "ASKPOLICY_OLLAMA_URL")]
    ollama_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a policy question
    Ask(AskCommand),

    /// Build or inspect the passage index
    Index(IndexCommand),

    /// Show the most frequently asked questions
    Insights(InsightsCommand),

    /// Show corpus statistics
    Stats(StatsCommand),

    /// List recently asked questions
    History(HistoryCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Flags and their env fallbacks decide which workspace and file to read
    let workspace = match cli.workspace {
        Some(workspace) => workspace,
        None => std::env::current_dir()?,
    };
    let config = AppConfig::load_from(&workspace, cli.config.as_deref())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        Some(workspace),
        cli.config,
        cli.model,
        cli.ollama_url,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    // Log startup
    tracing::info!("AskPolicy CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Generation model: {}", config.generation.model);
    tracing::debug!("Embedding provider: {}", config.embedding.provider);

    config.validate()?;
    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Index(_) => "index",
        Commands::Insights(_) => "insights",
        Commands::Stats(_) => "stats",
        Commands::History(_) => "history",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Insights(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::History(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
