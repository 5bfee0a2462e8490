//! Error types for the Codespaces client.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Result type alias for Codespaces operations.
pub type CodespacesResult<T> = Result<T, CodespacesError>;

/// Error kinds for categorizing Codespaces errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodespacesErrorKind {
    // Configuration errors
    /// Invalid base URL.
    InvalidBaseUrl,
    /// Invalid configuration.
    InvalidConfiguration,
    /// Missing authentication configuration.
    MissingAuth,

    // Request errors
    /// Invalid parameter supplied by the caller.
    InvalidParameter,
    /// Request validation failed (400).
    ValidationError,
    /// Unprocessable entity (422).
    UnprocessableEntity,

    // Auth errors
    /// Bad credentials (401).
    BadCredentials,
    /// Access forbidden (403).
    Forbidden,

    // Resource errors
    /// Resource not found (404).
    NotFound,
    /// Resource conflict (409).
    Conflict,

    // Rate limit errors
    /// Rate limit exceeded.
    RateLimitExceeded,

    // Network errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timeout.
    Timeout,
    /// Request was cancelled by the caller.
    Cancelled,

    // Server errors
    /// Internal server error (500).
    InternalError,
    /// Bad gateway (502).
    BadGateway,
    /// Service unavailable (503).
    ServiceUnavailable,

    // Response errors
    /// Failed to deserialize response.
    DeserializationError,
    /// Response did not have the expected shape.
    UnexpectedFormat,

    // Generic
    /// Unknown error.
    Unknown,
}

impl fmt::Display for CodespacesErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl => write!(f, "invalid_base_url"),
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::MissingAuth => write!(f, "missing_auth"),
            Self::InvalidParameter => write!(f, "invalid_parameter"),
            Self::ValidationError => write!(f, "validation_error"),
            Self::UnprocessableEntity => write!(f, "unprocessable_entity"),
            Self::BadCredentials => write!(f, "bad_credentials"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::RateLimitExceeded => write!(f, "rate_limit_exceeded"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InternalError => write!(f, "internal_error"),
            Self::BadGateway => write!(f, "bad_gateway"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::DeserializationError => write!(f, "deserialization_error"),
            Self::UnexpectedFormat => write!(f, "unexpected_format"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Rate limit information extracted from response headers.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed.
    pub limit: u32,
    /// Remaining requests in current window.
    pub remaining: u32,
    /// Time when the rate limit resets.
    pub reset_at: DateTime<Utc>,
    /// Resource category.
    pub resource: Option<String>,
}

/// Codespaces API error with detailed information.
#[derive(Error, Debug)]
pub struct CodespacesError {
    kind: CodespacesErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    documentation_url: Option<String>,
    rate_limit: Option<RateLimitInfo>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CodespacesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        Ok(())
    }
}

impl CodespacesError {
    /// Creates a new error.
    pub fn new(kind: CodespacesErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            documentation_url: None,
            rate_limit: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Sets the rate limit info.
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &CodespacesErrorKind {
        &self.kind
    }

    /// Gets the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Gets the rate limit info.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    /// Returns true if the fetcher would retry a response that produced this error.
    ///
    /// Only an upstream 502 counts; every other failure is terminal.
    pub fn is_retryable(&self) -> bool {
        self.kind == CodespacesErrorKind::BadGateway
    }

    /// Returns true if the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        self.kind == CodespacesErrorKind::Cancelled
    }

    /// Creates an error from an HTTP status code and decoded error body.
    pub fn from_response(
        status: u16,
        message: String,
        documentation_url: Option<String>,
        request_id: Option<String>,
    ) -> Self {
        let kind = Self::kind_from_status(status);
        let mut error = Self::new(kind, message).with_status(status);

        if let Some(url) = documentation_url {
            error = error.with_documentation_url(url);
        }
        if let Some(id) = request_id {
            error = error.with_request_id(id);
        }

        error
    }

    fn kind_from_status(status: u16) -> CodespacesErrorKind {
        match status {
            400 => CodespacesErrorKind::ValidationError,
            401 => CodespacesErrorKind::BadCredentials,
            403 => CodespacesErrorKind::Forbidden,
            404 => CodespacesErrorKind::NotFound,
            409 => CodespacesErrorKind::Conflict,
            422 => CodespacesErrorKind::UnprocessableEntity,
            429 => CodespacesErrorKind::RateLimitExceeded,
            500 => CodespacesErrorKind::InternalError,
            502 => CodespacesErrorKind::BadGateway,
            503 => CodespacesErrorKind::ServiceUnavailable,
            _ => CodespacesErrorKind::Unknown,
        }
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CodespacesErrorKind::InvalidConfiguration, message)
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(CodespacesErrorKind::InvalidParameter, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limit_exceeded(status: u16, info: RateLimitInfo) -> Self {
        Self::new(CodespacesErrorKind::RateLimitExceeded, "Rate limit exceeded")
            .with_status(status)
            .with_rate_limit(info)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(CodespacesErrorKind::Timeout, message)
    }

    /// Creates a cancellation error.
    pub fn cancelled() -> Self {
        Self::new(CodespacesErrorKind::Cancelled, "Request cancelled")
    }

    /// Creates a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(CodespacesErrorKind::DeserializationError, message)
    }
}
