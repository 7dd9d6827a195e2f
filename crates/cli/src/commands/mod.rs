//! Command handlers for the AskPolicy CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
mod corpus;
pub mod history;
pub mod index;
pub mod insights;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use history::HistoryCommand;
pub use index::IndexCommand;
pub use insights::InsightsCommand;
pub use stats::StatsCommand;
