//! # Codespaces Integration Library
//!
//! An HTTP client for the GitHub Codespaces API with:
//! - Link-header pagination that stops at a caller limit or the last page
//! - Bounded retries of single-codespace fetches on upstream 502s
//! - Repository suggestions from free text with `owner/repo` shorthand
//! - Cancellation through a caller-supplied token
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_codespaces::{AuthMethod, CodespacesClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CodespacesClient::builder()
//!         .auth(AuthMethod::from_env()?)
//!         .build()?;
//!     let cancel = CancellationToken::new();
//!
//!     for codespace in client.codespaces().list(-1, &cancel).await? {
//!         println!("{} ({})", codespace.name, codespace.state);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// HTTP client and transport
pub mod client;

// Pagination handling
pub mod pagination;

// API Services
pub mod services;

// Retry handling
pub mod resilience;

// Observability
pub mod observability;

// Re-exports for convenience
pub use auth::AuthMethod;
pub use client::{CodespacesClient, CodespacesClientBuilder};
pub use config::{CodespacesConfig, CodespacesConfigBuilder};
pub use errors::{CodespacesError, CodespacesErrorKind, CodespacesResult};
pub use pagination::{parse_link_header, ListLimit, Page, PageCursor, PaginatedLister, PaginationLinks};
pub use services::{RepoSearchParameters, RepoSearchQuery};
pub use types::*;
