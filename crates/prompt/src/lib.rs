//! Prompt system for AskPolicy.
//!
//! This crate provides the constrained answer prompt:
//! - YAML-based prompt definitions, overridable per workspace
//! - A built-in default answer prompt
//! - Handlebars template rendering with the answer policies injected

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_answer_prompt, build_prompt};
pub use loader::{default_answer_prompt, load_prompt, resolve_prompt, ANSWER_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition};
