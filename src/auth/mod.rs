//! Credentials attached to outgoing requests.
//!
//! Token acquisition happens elsewhere; this module only carries a token
//! and renders it as an `Authorization` header.

use crate::errors::{CodespacesError, CodespacesErrorKind, CodespacesResult};
use secrecy::{ExposeSecret, SecretString};

/// Environment variable consulted by [`AuthMethod::from_env`].
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Authentication method for the Codespaces API.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Personal Access Token (classic or fine-grained).
    Pat(SecretString),
    /// OAuth access token.
    OAuth(SecretString),
}

impl AuthMethod {
    /// Creates a PAT authentication method.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(SecretString::new(token.into()))
    }

    /// Creates an OAuth authentication method.
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::OAuth(SecretString::new(token.into()))
    }

    /// Reads a PAT from `GITHUB_TOKEN`.
    pub fn from_env() -> CodespacesResult<Self> {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.is_empty() => Ok(Self::pat(token)),
            _ => Err(CodespacesError::new(
                CodespacesErrorKind::MissingAuth,
                format!("Environment variable {} not set", TOKEN_ENV_VAR),
            )),
        }
    }

    /// Renders the `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            Self::Pat(token) | Self::OAuth(token) => format!("Bearer {}", token.expose_secret()),
        }
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Pat(t) => {
                let exposed = t.expose_secret();
                if exposed.starts_with("ghp_") {
                    "ghp_***"
                } else if exposed.starts_with("github_pat_") {
                    "github_pat_***"
                } else {
                    "***"
                }
            }
            Self::OAuth(_) => "gho_***",
        }
    }
}
