//! Timeout racing with cooperative cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::cancellation::CancellationToken;
use crate::errors::{Result, StepwiseError};

/// Races `operation` against a `budget`.
///
/// The operation receives a token that is cancelled when the budget runs
/// out. The operation's future is dropped at that point, which aborts any
/// in-flight request it owns; work it spawned can observe the token.
pub async fn with_timeout<T, F, Fut>(budget: Duration, label: &str, operation: F) -> Result<T>
where
    F: FnOnce(Arc<CancellationToken>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let token = Arc::new(CancellationToken::new());
    let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);

    match timeout(budget, operation(Arc::clone(&token))).await {
        Ok(result) => result,
        Err(_) => {
            token.cancel(format!("{label} exceeded {budget_ms}ms"));
            warn!(label = %label, budget_ms, "Operation timed out");
            Err(StepwiseError::Timeout {
                label: label.to_string(),
                budget_ms,
            })
        }
    }
}
