//! Codespaces API client and the shared request primitive.

use crate::auth::AuthMethod;
use crate::config::{CodespacesConfig, CodespacesConfigBuilder, RetryConfig};
use crate::errors::{CodespacesError, CodespacesErrorKind, CodespacesResult, RateLimitInfo};
use crate::observability::{Metrics, MetricsSnapshot, RequestTimer, TracingHooks};
use crate::pagination::{PageCursor, PaginationLinks};
use crate::resilience::RetryPolicy;
use crate::services::{CodespacesService, RepositoriesService, SearchService};
use chrono::DateTime;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Error response body format.
#[derive(Debug, serde::Deserialize)]
struct ErrorResponse {
    message: String,
    documentation_url: Option<String>,
}

/// Codespaces API client.
pub struct CodespacesClient {
    http: Client,
    config: CodespacesConfig,
    metrics: Arc<Metrics>,
}

impl CodespacesClient {
    /// Creates a new client.
    pub fn new(config: CodespacesConfig) -> CodespacesResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .build()
            .map_err(|e| {
                CodespacesError::new(
                    CodespacesErrorKind::InvalidConfiguration,
                    format!("Failed to create HTTP client: {}", e),
                )
                .with_cause(e)
            })?;

        tracing::debug!(
            base_url = %config.base_url,
            token = config.auth.as_ref().map(AuthMethod::token_prefix).unwrap_or("none"),
            "Created Codespaces client"
        );

        Ok(Self {
            http,
            config,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Creates a new client builder.
    pub fn builder() -> CodespacesClientBuilder {
        CodespacesClientBuilder::new()
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets the configuration.
    pub fn config(&self) -> &CodespacesConfig {
        &self.config
    }

    /// Gets a snapshot of request metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // Service accessors

    /// Gets the codespaces service.
    pub fn codespaces(&self) -> CodespacesService<'_> {
        CodespacesService::new(self)
    }

    /// Gets the repositories service.
    pub fn repositories(&self) -> RepositoriesService<'_> {
        RepositoriesService::new(self)
    }

    /// Gets the search service.
    pub fn search(&self) -> SearchService<'_> {
        SearchService::new(self)
    }

    // HTTP methods

    /// Makes a GET request and decodes the body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> CodespacesResult<T> {
        let url = self.build_url(path);
        let response = self
            .send(Method::GET, &url, Option::<&()>::None, cancel)
            .await?;
        let response = Self::check_status(response, cancel).await?;
        Self::decode(response, cancel).await
    }

    /// Makes a GET request with query parameters.
    pub async fn get_with_params<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> CodespacesResult<T> {
        let query_string = serde_urlencoded::to_string(params).map_err(|e| {
            CodespacesError::new(
                CodespacesErrorKind::InvalidParameter,
                format!("Failed to serialize parameters: {}", e),
            )
        })?;

        let url = self.build_url(path);
        let full_url = if query_string.is_empty() {
            url
        } else {
            format!("{}?{}", url, query_string)
        };

        let response = self
            .send(Method::GET, &full_url, Option::<&()>::None, cancel)
            .await?;
        let response = Self::check_status(response, cancel).await?;
        Self::decode(response, cancel).await
    }

    /// Makes a GET request, repeating it while the server answers 502.
    ///
    /// The last response is decoded when successful; a final 502 surfaces as
    /// a `BadGateway` error.
    pub async fn get_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> CodespacesResult<T> {
        let url = self.build_url(path);
        let policy = RetryPolicy::from(&self.config.retry).with_metrics(self.metrics.clone());

        let retried = policy
            .execute(cancel, || {
                self.send(Method::GET, &url, Option::<&()>::None, cancel)
            })
            .await?;

        let response = Self::check_status(retried.response, cancel).await?;
        Self::decode(response, cancel).await
    }

    /// Fetches one collection page and its Link header.
    pub async fn get_page<R: DeserializeOwned>(
        &self,
        cursor: &PageCursor,
        cancel: &CancellationToken,
    ) -> CodespacesResult<(R, PaginationLinks)> {
        let response = self
            .send(Method::GET, cursor.url(), Option::<&()>::None, cancel)
            .await?;
        let response = Self::check_status(response, cancel).await?;
        let links = PaginationLinks::from_headers(response.headers());
        let body = Self::decode(response, cancel).await?;
        self.metrics.record_page();
        Ok((body, links))
    }

    /// Makes a PATCH request.
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> CodespacesResult<T> {
        let url = self.build_url(path);
        let response = self.send(Method::PATCH, &url, Some(body), cancel).await?;
        let response = Self::check_status(response, cancel).await?;
        Self::decode(response, cancel).await
    }

    /// Issues one request and returns the response whatever its status.
    ///
    /// Transport failures and cancellation become errors; status handling is
    /// left to the caller.
    pub async fn send<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Response> {
        let body_bytes = body.map(serde_json::to_vec).transpose().map_err(|e| {
            CodespacesError::new(
                CodespacesErrorKind::InvalidParameter,
                format!("Failed to serialize request body: {}", e),
            )
        })?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", &self.config.api_version);

        if let Some(auth) = &self.config.auth {
            request = request.header(AUTHORIZATION, auth.header_value());
        }

        if let Some(bytes) = body_bytes {
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        TracingHooks::on_request_start(method.as_str(), url);
        let timer = RequestTimer::start(&self.metrics);

        let result = with_cancel(cancel, async {
            request.send().await.map_err(|e| {
                if e.is_timeout() {
                    CodespacesError::timeout(format!("Request timed out: {}", e)).with_cause(e)
                } else if e.is_connect() {
                    CodespacesError::new(
                        CodespacesErrorKind::ConnectionFailed,
                        format!("Connection failed: {}", e),
                    )
                    .with_cause(e)
                } else {
                    CodespacesError::new(
                        CodespacesErrorKind::Unknown,
                        format!("Request failed: {}", e),
                    )
                    .with_cause(e)
                }
            })
        })
        .await;

        match result {
            Ok(response) => {
                let status = response.status();
                let elapsed = timer.finish(status.is_success());
                TracingHooks::on_request_complete(method.as_str(), url, status.as_u16(), elapsed);
                Ok(response)
            }
            Err(error) => {
                timer.finish(false);
                TracingHooks::on_request_error(method.as_str(), url, &error.to_string());
                Err(error)
            }
        }
    }

    /// Turns a non-2xx response into an error.
    pub async fn check_status(
        response: Response,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::handle_error_response(response, cancel).await)
        }
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        cancel: &CancellationToken,
    ) -> CodespacesResult<T> {
        let bytes = with_cancel(cancel, async {
            response.bytes().await.map_err(|e| {
                CodespacesError::new(
                    CodespacesErrorKind::ConnectionFailed,
                    format!("Failed to read response body: {}", e),
                )
                .with_cause(e)
            })
        })
        .await?;

        serde_json::from_slice(&bytes).map_err(|e| {
            CodespacesError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_cause(e)
        })
    }

    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn extract_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let limit = header("x-ratelimit-limit")?.parse().ok()?;
        let remaining = header("x-ratelimit-remaining")?.parse().ok()?;
        let reset_timestamp: i64 = header("x-ratelimit-reset")?.parse().ok()?;
        let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

        Some(RateLimitInfo {
            limit,
            remaining,
            reset_at,
            resource: header("x-ratelimit-resource").map(String::from),
        })
    }

    async fn handle_error_response(
        response: Response,
        cancel: &CancellationToken,
    ) -> CodespacesError {
        let status = response.status();
        let rate_limit = Self::extract_rate_limit(response.headers());
        let request_id = response
            .headers()
            .get("x-github-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(info) = rate_limit.as_ref().filter(|info| info.remaining == 0) {
                TracingHooks::on_rate_limit_exceeded(info);
                let mut error = CodespacesError::rate_limit_exceeded(status.as_u16(), info.clone());
                if let Some(id) = request_id {
                    error = error.with_request_id(id);
                }
                return error;
            }
        }

        let error_body = match with_cancel(cancel, async {
            Ok(response.json::<ErrorResponse>().await.ok())
        })
        .await
        {
            Ok(body) => body,
            Err(cancelled) => return cancelled,
        };

        let message = error_body
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("HTTP {} error", status.as_u16()));

        let documentation_url = error_body.and_then(|e| e.documentation_url);

        let mut error =
            CodespacesError::from_response(status.as_u16(), message, documentation_url, request_id);

        if let Some(info) = rate_limit {
            error = error.with_rate_limit(info);
        }

        error
    }
}

/// Races `future` against cancellation of `cancel`.
async fn with_cancel<T, F>(cancel: &CancellationToken, future: F) -> CodespacesResult<T>
where
    F: Future<Output = CodespacesResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CodespacesError::cancelled()),
        result = future => result,
    }
}

/// Builder for CodespacesClient.
pub struct CodespacesClientBuilder {
    config_builder: CodespacesConfigBuilder,
}

impl CodespacesClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: CodespacesConfig::builder(),
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth(auth);
        self
    }

    /// Sets a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config_builder = self.config_builder.retry(config);
        self
    }

    /// Sets the delay between fetch attempts.
    pub fn retry_delay(mut self, delay: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.retry_delay(delay);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.config_builder = self.config_builder.no_retry();
        self
    }

    /// Builds the client.
    pub fn build(self) -> CodespacesResult<CodespacesClient> {
        let config = self.config_builder.build()?;
        CodespacesClient::new(config)
    }
}

impl Default for CodespacesClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
