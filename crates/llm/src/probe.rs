//! Liveness checks for the preferred generation backend.

use askpolicy_core::{AppError, AppResult};
use std::time::Duration;

/// Answers "is the preferred backend reachable right now?".
#[async_trait::async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Return `true` when the backend answered within the probe timeout.
    async fn is_alive(&self) -> bool;

    /// Human-readable target of the probe, used in log lines.
    fn target(&self) -> &str;
}

/// Probe that issues `GET {base_url}/api/tags` with a bounded timeout.
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create probe HTTP client: {}", e)))?;

        Ok(Self {
            url: format!("{}/api/tags", base_url.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait::async_trait]
impl LivenessProbe for HttpProbe {
    async fn is_alive(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!(url = %self.url, status = %response.status(), "Probe got non-success status");
                false
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Probe failed");
                false
            }
        }
    }

    fn target(&self) -> &str {
        &self.url
    }
}
