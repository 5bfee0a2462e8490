//! Bounded retry of single-resource fetches on transient upstream failures.

use crate::config::RetryConfig;
use crate::errors::{CodespacesError, CodespacesResult};
use crate::observability::{Metrics, TracingHooks};
use reqwest::StatusCode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Anything carrying an HTTP status the retry loop can classify.
pub trait HasStatus {
    /// The response status.
    fn status(&self) -> StatusCode;
}

impl HasStatus for reqwest::Response {
    fn status(&self) -> StatusCode {
        reqwest::Response::status(self)
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct Retried<R> {
    /// The last response received.
    pub response: R,
    /// Attempts made, including the first.
    pub attempts: u32,
}

/// Retry budget: how many times to repeat and how long to wait in between.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` repeats after the first attempt.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            metrics: None,
        }
    }

    /// Counts every scheduled retry in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns true for the one status worth repeating a request for.
    pub fn is_transient(status: StatusCode) -> bool {
        status == StatusCode::BAD_GATEWAY
    }

    /// Runs `operation` until it yields a non-transient status or the budget runs out.
    ///
    /// The last response is returned as-is even when it is still transient;
    /// callers must check its status. Operation errors (transport failures,
    /// cancellation) are returned immediately.
    pub async fn execute<R, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> CodespacesResult<Retried<R>>
    where
        R: HasStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = CodespacesResult<R>>,
    {
        let mut attempts = 0;

        loop {
            let response = operation().await?;
            attempts += 1;

            let status = response.status();
            if !Self::is_transient(status) {
                return Ok(Retried { response, attempts });
            }

            if attempts > self.max_retries {
                TracingHooks::on_retries_exhausted(attempts, status.as_u16());
                return Ok(Retried { response, attempts });
            }

            TracingHooks::on_retry(attempts, status.as_u16(), self.delay);
            if let Some(metrics) = &self.metrics {
                metrics.record_retry();
            }

            if !self.delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(CodespacesError::cancelled()),
                    _ = sleep(self.delay) => {}
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.delay)
    }
}
