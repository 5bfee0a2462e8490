//! Repository operations.

use crate::client::CodespacesClient;
use crate::errors::{CodespacesError, CodespacesResult};
use crate::types::Repository;
use tokio_util::sync::CancellationToken;

/// Service for repository operations.
pub struct RepositoriesService<'a> {
    client: &'a CodespacesClient,
}

impl<'a> RepositoriesService<'a> {
    /// Creates a new repositories service.
    pub fn new(client: &'a CodespacesClient) -> Self {
        Self { client }
    }

    /// Gets a repository by its `owner/repo` name.
    pub async fn get(&self, nwo: &str, cancel: &CancellationToken) -> CodespacesResult<Repository> {
        let (owner, repo) = split_nwo(nwo)?;
        self.client
            .get(&format!("/repos/{}/{}", owner, repo), cancel)
            .await
    }
}

fn split_nwo(nwo: &str) -> CodespacesResult<(&str, &str)> {
    match nwo.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(CodespacesError::invalid_parameter(format!(
            "Expected OWNER/REPO, got {:?}",
            nwo
        ))),
    }
}
