//! Text generation for AskPolicy.
//!
//! Generation is one capability with two interchangeable backends behind it:
//! a preferred local Ollama service and an in-process extractive fallback.
//! [`AnswerGenerator`] picks between them per call with a bounded-timeout
//! liveness probe, loading the fallback only the first time it is needed.
//!
//! # Example
//! ```no_run
//! use askpolicy_core::config::{AnswerPolicyConfig, GenerationConfig};
//! use askpolicy_llm::create_generator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = create_generator(&GenerationConfig::default(), &AnswerPolicyConfig::default())?;
//! let generation = generator.generate("Context:\nLeave is 20 days.\n\nQuestion:\nHow much leave?").await?;
//! println!("{} (via {})", generation.text, generation.backend);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generator;
pub mod probe;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{Grounding, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_generator};
pub use generator::{AnswerGenerator, FallbackLoader};
pub use probe::{HttpProbe, LivenessProbe};
pub use providers::{ExtractiveClient, OllamaClient};
pub use types::{BackendKind, Generation};
