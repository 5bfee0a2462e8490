//! Configuration types for the Codespaces client.

use crate::auth::AuthMethod;
use crate::errors::{CodespacesError, CodespacesErrorKind};
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "integrations-codespaces/0.1.0";

/// Page size used when listing codespaces.
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 100;

/// Page size used for repository search when the caller sets no cap.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 30;

/// Retry configuration for single-resource fetches.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Constant delay between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(100),
        }
    }
}

/// Page size configuration.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Records per page for collection listings.
    pub list_page_size: u32,
    /// Results per page for repository search.
    pub search_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Codespaces client configuration.
#[derive(Debug, Clone)]
pub struct CodespacesConfig {
    /// API base URL.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
    /// Authentication method. Requests go out unauthenticated when unset.
    pub auth: Option<AuthMethod>,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Page size configuration.
    pub pagination: PaginationConfig,
    /// Connection pool configuration.
    pub pool: PoolConfig,
}

impl Default for CodespacesConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            pagination: PaginationConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl CodespacesConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CodespacesConfigBuilder {
        CodespacesConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), CodespacesError> {
        if self.base_url.is_empty() {
            return Err(CodespacesError::new(
                CodespacesErrorKind::InvalidBaseUrl,
                "Base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(CodespacesError::new(
                CodespacesErrorKind::InvalidBaseUrl,
                "Base URL must start with http:// or https://",
            ));
        }

        if self.user_agent.is_empty() {
            return Err(CodespacesError::configuration("User-Agent is required by the API"));
        }

        if self.pagination.list_page_size == 0 || self.pagination.search_page_size == 0 {
            return Err(CodespacesError::configuration("Page sizes must be positive"));
        }

        Ok(())
    }
}

/// Builder for CodespacesConfig.
#[derive(Debug, Default)]
pub struct CodespacesConfigBuilder {
    base_url: Option<String>,
    api_version: Option<String>,
    auth: Option<AuthMethod>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    retry: Option<RetryConfig>,
    pagination: Option<PaginationConfig>,
    pool: Option<PoolConfig>,
}

impl CodespacesConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Sets the delay between fetch attempts, keeping the retry count.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        let mut retry = self.retry.take().unwrap_or_default();
        retry.delay = delay;
        self.retry = Some(retry);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.retry = Some(RetryConfig {
            max_retries: 0,
            ..Default::default()
        });
        self
    }

    /// Sets the page size configuration.
    pub fn pagination(mut self, config: PaginationConfig) -> Self {
        self.pagination = Some(config);
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.pool = Some(config);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<CodespacesConfig, CodespacesError> {
        let config = CodespacesConfig {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            auth: self.auth,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retry: self.retry.unwrap_or_default(),
            pagination: self.pagination.unwrap_or_default(),
            pool: self.pool.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
