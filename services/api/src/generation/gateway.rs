//! services/api/src/generation/gateway.rs
//!
//! Bounded retry with exponential backoff around a `GenerativeModel`.
//! Delays are `tokio::time::sleep`, so a waiting request never blocks a
//! runtime worker thread.

use campus_ai_core::{GatewayRequest, GenerationError, GenerativeModel};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Tunable parameters for the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of calls, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based):
    /// `base * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Sends requests to the model, retrying transport and availability
/// failures. Response-shape problems are the parser's concern and are
/// never retried here.
#[derive(Clone)]
pub struct RetryingGateway {
    model: Arc<dyn GenerativeModel>,
    policy: RetryPolicy,
}

impl RetryingGateway {
    pub fn new(model: Arc<dyn GenerativeModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub async fn send(&self, request: &GatewayRequest) -> Result<Value, GenerationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.model.generate(request).await {
                Ok(envelope) => return Ok(envelope),
                Err(e) if attempt >= self.policy.max_attempts => {
                    error!(attempt, error = %e, "Model request failed, giving up");
                    return Err(GenerationError::ExhaustedRetries {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model request failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
