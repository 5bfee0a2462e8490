//! Codespace operations.

use crate::client::CodespacesClient;
use crate::errors::{CodespacesError, CodespacesResult};
use crate::pagination::{ListLimit, Page, PageCursor, PaginatedLister};
use crate::types::{Codespace, CodespaceList, EditCodespaceParams};
use tokio_util::sync::CancellationToken;

const CODESPACES_PATH: &str = "/user/codespaces";

/// Service for codespace operations.
pub struct CodespacesService<'a> {
    client: &'a CodespacesClient,
}

impl<'a> CodespacesService<'a> {
    /// Creates a new codespaces service.
    pub fn new(client: &'a CodespacesClient) -> Self {
        Self { client }
    }

    /// Lists the authenticated user's codespaces.
    ///
    /// A positive `limit` caps the result; zero or negative lists everything.
    pub async fn list(&self, limit: i64, cancel: &CancellationToken) -> CodespacesResult<Vec<Codespace>> {
        self.list_with_limit(ListLimit::from_signed(limit), cancel)
            .await
    }

    /// Lists codespaces page by page until `limit` is met or the server has no next page.
    pub async fn list_with_limit(
        &self,
        limit: ListLimit,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Vec<Codespace>> {
        let lister = PaginatedLister::new(limit, self.client.config().pagination.list_page_size);
        let endpoint = format!(
            "{}{}",
            self.client.base_url().trim_end_matches('/'),
            CODESPACES_PATH
        );
        let first = lister.first_cursor(&endpoint)?;

        lister
            .collect(first, move |cursor| async move { self.list_page(&cursor, cancel).await })
            .await
    }

    /// Fetches a single page of codespaces.
    pub async fn list_page(
        &self,
        cursor: &PageCursor,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Page<Codespace>> {
        let (body, links) = self
            .client
            .get_page::<CodespaceList>(cursor, cancel)
            .await?;
        Ok(Page::new(body.codespaces, links).with_total_count(body.total_count))
    }

    /// Gets a codespace by name, retrying while the server answers 502.
    ///
    /// With `include_connection` the server also returns live connection details.
    pub async fn get(
        &self,
        name: &str,
        include_connection: bool,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Codespace> {
        let mut path = format!("{}/{}", CODESPACES_PATH, name);
        if include_connection {
            path.push_str("?internal=true&refresh=true");
        }
        self.client.get_with_retry(&path, cancel).await
    }

    /// Edits a codespace and returns the updated record.
    pub async fn edit(
        &self,
        name: &str,
        params: &EditCodespaceParams,
        cancel: &CancellationToken,
    ) -> CodespacesResult<Codespace> {
        if params.is_empty() {
            return Err(CodespacesError::invalid_parameter(
                "Edit requires at least one change",
            ));
        }
        self.client
            .patch(&format!("{}/{}", CODESPACES_PATH, name), params, cancel)
            .await
    }
}
