//! Resilience layer wrapped around every remote call.
//!
//! This module provides:
//! - [`retry_with_backoff`] for transient overloads
//! - [`with_timeout`] for bounding an operation
//! - [`Resilience`], which composes the two so that the timeout bounds the
//!   whole retry sequence rather than each attempt

mod retry;
mod timeout;

pub use retry::{retry_with_backoff, should_retry, JitterStrategy, RetryConfig, RetryDecision};
pub use timeout::with_timeout;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::errors::{Result, StepwiseError};

/// Retry policy plus an optional caller-owned cancellation token.
#[derive(Debug, Clone, Default)]
pub struct Resilience {
    retry: RetryConfig,
    parent: Option<Arc<CancellationToken>>,
}

impl Resilience {
    /// Creates a resilience wrapper with the given retry policy.
    #[must_use]
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            retry,
            parent: None,
        }
    }

    /// Ties every call to a caller-owned token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.parent = Some(token);
        self
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Runs `operation` as `with_timeout(retry_with_backoff(operation))`.
    pub async fn call<T, F, Fut>(&self, label: &str, budget: Duration, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        debug!(label = %label, budget_ms, "Remote call");

        let retry = &self.retry;
        let guarded = with_timeout(budget, label, |token| async move {
            retry_with_backoff(retry, label, &token, operation).await
        });

        match &self.parent {
            Some(parent) => {
                if parent.is_cancelled() {
                    return Err(Self::cancelled(parent));
                }
                tokio::select! {
                    result = guarded => result,
                    () = parent.cancelled() => Err(Self::cancelled(parent)),
                }
            }
            None => guarded.await,
        }
    }

    fn cancelled(token: &CancellationToken) -> StepwiseError {
        StepwiseError::Cancelled(token.reason().unwrap_or_else(|| "cancelled".to_string()))
    }
}
