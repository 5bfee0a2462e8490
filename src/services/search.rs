//! Repository search used to suggest codespace sources.

use crate::client::CodespacesClient;
use crate::errors::CodespacesResult;
use crate::types::Repository;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Qualifier restricting matches to the repository name.
const NAME_QUALIFIER: &str = "in:name";

/// Caller options for repository suggestions.
#[derive(Debug, Clone, Default)]
pub struct RepoSearchParameters {
    /// Sort field; blank means server order.
    pub sort: Option<String>,
    /// Results to request; zero means the configured default.
    pub max_repos: u32,
}

impl RepoSearchParameters {
    /// Sets the sort field.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Caps the number of results.
    pub fn max_repos(mut self, max_repos: u32) -> Self {
        self.max_repos = max_repos;
        self
    }
}

/// A repository search derived from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSearchQuery {
    /// Text as typed by the caller.
    pub text: String,
    /// Query with any `owner/` prefix turned into a `user:` qualifier.
    pub query: String,
    /// Sort field, when one was given.
    pub sort: Option<String>,
    /// Results per page.
    pub per_page: u32,
}

impl RepoSearchQuery {
    /// Builds a query from `text`.
    ///
    /// `owner/repo` becomes `repo user:owner`; only the first slash splits, so
    /// `owner/repo/extra` becomes `repo/extra user:owner`.
    pub fn new(text: &str, params: &RepoSearchParameters, default_per_page: u32) -> Self {
        let query = match text.split_once('/') {
            Some((owner, rest)) => format!("{} user:{}", rest, owner),
            None => text.to_string(),
        };

        let sort = params.sort.clone().filter(|s| !s.is_empty());
        let per_page = if params.max_repos > 0 {
            params.max_repos
        } else {
            default_per_page
        };

        Self {
            text: text.to_string(),
            query,
            sort,
            per_page,
        }
    }

    /// The `q` parameter sent to the server.
    pub fn q(&self) -> String {
        format!("{} {}", self.query, NAME_QUALIFIER)
    }

    fn to_params(&self) -> SearchRepositoriesParams {
        SearchRepositoriesParams {
            q: self.q(),
            sort: self.sort.clone(),
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchRepositoriesParams {
    q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<String>,
    per_page: u32,
}

/// Search result for repositories.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRepositoriesResult {
    /// Total count.
    #[serde(default)]
    pub total_count: u64,
    /// Whether results were truncated.
    #[serde(default)]
    pub incomplete_results: bool,
    /// Matching repositories.
    #[serde(default)]
    pub items: Vec<Repository>,
}

/// Service for search operations.
pub struct SearchService<'a> {
    client: &'a CodespacesClient,
}

impl<'a> SearchService<'a> {
    /// Creates a new search service.
    pub fn new(client: &'a CodespacesClient) -> Self {
        Self { client }
    }

    /// Runs a repository search for a built query.
    pub async fn repositories(
        &self,
        query: &RepoSearchQuery,
        cancel: &CancellationToken,
    ) -> CodespacesResult<SearchRepositoriesResult> {
        self.client
            .get_with_params("/search/repositories", &query.to_params(), cancel)
            .await
    }

    /// Suggests repositories matching `text`, returning full names in server order.
    pub async fn repo_suggestions(
        &self,
        text: &str,
        params: &RepoSearchParameters,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Vec<String>> {
        let query = RepoSearchQuery::new(
            text,
            params,
            self.client.config().pagination.search_page_size,
        );
        tracing::debug!(query = %query.q(), per_page = query.per_page, "Searching repositories");

        let result = self.repositories(&query, cancel).await?;
        Ok(result.items.into_iter().map(|repo| repo.full_name).collect())
    }
}
