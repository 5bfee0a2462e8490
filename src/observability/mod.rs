//! Request metrics and tracing hooks.

use crate::errors::RateLimitInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Metrics collector for Codespaces API operations.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_failed: AtomicU64,
    requests_retried: AtomicU64,
    pages_fetched: AtomicU64,
    latency_total_us: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful request.
    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed request.
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a retried attempt.
    pub fn record_retry(&self) {
        self.requests_retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a collection page.
    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records request latency.
    pub fn record_latency(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.latency_total_us.fetch_add(us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the average latency in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        let total = self.latency_total_us.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            0
        } else {
            total / count
        }
    }

    /// Gets a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_retried: self.requests_retried.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            average_latency_us: self.average_latency_us(),
        }
    }

    /// Resets all metrics.
    pub fn reset(&self) {
        self.requests_total.store(0, Ordering::Relaxed);
        self.requests_success.store(0, Ordering::Relaxed);
        self.requests_failed.store(0, Ordering::Relaxed);
        self.requests_retried.store(0, Ordering::Relaxed);
        self.pages_fetched.store(0, Ordering::Relaxed);
        self.latency_total_us.store(0, Ordering::Relaxed);
        self.latency_count.store(0, Ordering::Relaxed);
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests sent, counting every retry attempt.
    pub requests_total: u64,
    /// Requests answered with a 2xx status.
    pub requests_success: u64,
    /// Requests that failed in transport or with a non-2xx status.
    pub requests_failed: u64,
    /// Attempts repeated after a transient status.
    pub requests_retried: u64,
    /// Collection pages fetched.
    pub pages_fetched: u64,
    /// Average latency in microseconds.
    pub average_latency_us: u64,
}

/// Measures one request and records its outcome.
pub(crate) struct RequestTimer<'a> {
    start: Instant,
    metrics: &'a Metrics,
}

impl<'a> RequestTimer<'a> {
    pub(crate) fn start(metrics: &'a Metrics) -> Self {
        metrics.record_request();
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Records the status-dependent outcome and returns the elapsed time.
    pub(crate) fn finish(self, success: bool) -> Duration {
        let elapsed = self.start.elapsed();
        if success {
            self.metrics.record_success();
        } else {
            self.metrics.record_failure();
        }
        self.metrics.record_latency(elapsed);
        elapsed
    }
}

/// Tracing hooks for Codespaces API operations.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(method: &str, url: &str) {
        debug!(method = %method, url = %url, "Codespaces API request started");
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        debug!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "Codespaces API request completed"
        );
    }

    /// Logs a transport-level failure.
    pub fn on_request_error(method: &str, url: &str, error: &str) {
        warn!(method = %method, url = %url, error = %error, "Codespaces API request failed");
    }

    /// Logs a retry attempt.
    pub fn on_retry(attempt: u32, status: u16, delay: Duration) {
        debug!(
            attempt = attempt,
            status = status,
            delay_ms = delay.as_millis() as u64,
            "Retrying after transient status"
        );
    }

    /// Logs an exhausted retry budget.
    pub fn on_retries_exhausted(attempts: u32, status: u16) {
        warn!(attempts = attempts, status = status, "Retry budget exhausted");
    }

    /// Logs a fetched collection page.
    pub fn on_page(page: u32, per_page: u32, received: usize, accumulated: usize) {
        debug!(
            page = page,
            per_page = per_page,
            received = received,
            accumulated = accumulated,
            "Fetched collection page"
        );
    }

    /// Logs rate limit exceeded.
    pub fn on_rate_limit_exceeded(info: &RateLimitInfo) {
        warn!(
            limit = info.limit,
            remaining = info.remaining,
            reset_at = %info.reset_at,
            resource = info.resource.as_deref().unwrap_or("core"),
            "Rate limit exceeded"
        );
    }
}
