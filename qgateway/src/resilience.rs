//! Retry scheduling for opening completion streams, plus the operation hook
//! contract observability layers implement.
//!
//! Retry only ever wraps *opening* a stream. A generation that has already
//! produced fragments is never re-invoked here; interrupted streams are
//! settled by the session layer instead.

use std::future::Future;
use std::time::Duration;

use crate::{GatewayError, GatewayId};

/// Bounded doubling backoff for stream opening. `max_attempts` counts the
/// first try, so `disabled()` means exactly one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self::new(1)
    }

    /// Delay before the attempt after `attempt`, or `None` when the error is
    /// terminal or the attempt budget is spent. The delay doubles per attempt
    /// and saturates at `max_backoff`.
    pub fn next_delay(&self, attempt: u32, error: &GatewayError) -> Option<Duration> {
        if !error.retryable || attempt >= self.max_attempts {
            return None;
        }

        let doublings = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1 << doublings);
        Some(delay.min(self.max_backoff))
    }
}

pub trait GatewayOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _gateway: GatewayId, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _gateway: GatewayId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &GatewayError,
    ) {
    }

    fn on_success(&self, _gateway: GatewayId, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _gateway: GatewayId,
        _operation: &str,
        _attempts: u32,
        _error: &GatewayError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGatewayHooks;

impl GatewayOperationHooks for NoopGatewayHooks {}

/// Drives `open` until it succeeds, the policy gives up, or the error is not
/// retryable. Only pre-stream failures reach this loop; anything after the
/// first fragment is `Interrupted` and never retryable.
pub(crate) async fn open_with_retry<T, Op, Fut>(
    gateway: GatewayId,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn GatewayOperationHooks,
    mut open: Op,
) -> Result<T, GatewayError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(gateway, operation, attempt);

        let error = match open().await {
            Ok(value) => {
                hooks.on_success(gateway, operation, attempt);
                return Ok(value);
            }
            Err(error) => error,
        };

        match policy.next_delay(attempt, &error) {
            Some(delay) => {
                hooks.on_retry_scheduled(gateway, operation, attempt, delay, &error);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => {
                hooks.on_failure(gateway, operation, attempt, &error);
                return Err(error);
            }
        }
    }
}
