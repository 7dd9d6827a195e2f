//! Generation result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The preferred low-latency service answered
    Primary,

    /// The in-process fallback answered
    Fallback,

    /// A fixed response policy answered without invoking any backend
    Policy,
}

impl BackendKind {
    /// Get the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text returned by the Answer Generator, tagged with its backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub backend: BackendKind,
}

impl Generation {
    pub fn new(text: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            text: text.into(),
            backend,
        }
    }
}
