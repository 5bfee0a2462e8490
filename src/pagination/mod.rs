//! Link-header pagination for collection endpoints.

use crate::errors::{CodespacesError, CodespacesErrorKind, CodespacesResult};
use crate::observability::TracingHooks;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::future::Future;

/// Parses an RFC 8288 `Link` header into a map from relation name to URL.
///
/// Entries without a `<url>` or a `rel` parameter are skipped. A `rel`
/// holding several space-separated relations registers the URL under each.
pub fn parse_link_header(header_value: &str) -> HashMap<String, String> {
    let mut relations = HashMap::new();

    for entry in header_value.split(',') {
        let mut segments = entry.split(';').map(str::trim);

        let url = match segments.next() {
            Some(target) if target.starts_with('<') && target.ends_with('>') => {
                &target[1..target.len() - 1]
            }
            _ => continue,
        };

        for param in segments {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("rel") {
                continue;
            }
            for rel in value.trim().trim_matches('"').split_whitespace() {
                relations
                    .entry(rel.to_string())
                    .or_insert_with(|| url.to_string());
            }
        }
    }

    relations
}

/// Pagination links parsed from the Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Builds links from a raw Link header value.
    pub fn from_header(header_value: &str) -> Self {
        let mut relations = parse_link_header(header_value);
        Self {
            next: relations.remove("next"),
            prev: relations.remove("prev"),
            first: relations.remove("first"),
            last: relations.remove("last"),
        }
    }

    /// Builds links from response headers. A missing header means a single page.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Gets the total page count from the last link.
    pub fn total_pages(&self) -> Option<u32> {
        self.last.as_deref().and_then(extract_page_number)
    }
}

/// A single page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The records in server order.
    pub items: Vec<T>,
    /// Pagination links.
    pub links: PaginationLinks,
    /// Total count reported by the server.
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    /// Creates a new page.
    pub fn new(items: Vec<T>, links: PaginationLinks) -> Self {
        Self {
            items,
            links,
            total_count: None,
        }
    }

    /// Sets total count.
    pub fn with_total_count(mut self, count: u64) -> Self {
        self.total_count = Some(count);
        self
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.links.has_next()
    }

    /// Returns the URL for the next page.
    pub fn next_url(&self) -> Option<&str> {
        self.links.next.as_deref()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// How many records a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLimit {
    /// Follow next links until the server stops supplying them.
    Unlimited,
    /// Stop once this many records have been collected.
    AtMost(usize),
}

impl ListLimit {
    /// Interprets a signed limit: anything below one means unlimited.
    pub fn from_signed(limit: i64) -> Self {
        if limit > 0 {
            Self::AtMost(limit as usize)
        } else {
            Self::Unlimited
        }
    }

    /// Records still wanted after `fetched` have been collected.
    pub fn remaining(&self, fetched: usize) -> Option<usize> {
        match self {
            Self::Unlimited => None,
            Self::AtMost(max) => Some(max.saturating_sub(fetched)),
        }
    }

    /// Returns true once `fetched` satisfies the limit.
    pub fn is_reached(&self, fetched: usize) -> bool {
        self.remaining(fetched) == Some(0)
    }

    /// Page size for a request, shrunk to the remainder when that is smaller.
    pub fn page_size(&self, default: u32, fetched: usize) -> u32 {
        match self.remaining(fetched) {
            Some(remaining) if remaining < default as usize => remaining as u32,
            _ => default,
        }
    }
}

/// Position of a collection fetch: which page, how large, and where to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// 1-indexed page number.
    pub page: u32,
    /// Records requested for this page.
    pub per_page: u32,
    url: String,
}

impl PageCursor {
    /// Cursor for the first page of `endpoint`.
    pub fn first(endpoint: &str, per_page: u32) -> CodespacesResult<Self> {
        let url = with_query(endpoint, 1, per_page)?;
        Ok(Self {
            page: 1,
            per_page,
            url,
        })
    }

    /// Advances to the server-supplied next link, requesting `per_page` records.
    ///
    /// The link's own `per_page` is replaced. A link that does not move past
    /// the current page is rejected.
    pub fn advance(&self, next_url: &str, per_page: u32) -> CodespacesResult<Self> {
        let page = extract_page_number(next_url).unwrap_or(self.page + 1);
        if page <= self.page {
            return Err(CodespacesError::new(
                CodespacesErrorKind::UnexpectedFormat,
                format!(
                    "Next link points at page {} while on page {}",
                    page, self.page
                ),
            ));
        }

        let mut url = url::Url::parse(next_url).map_err(|e| {
            CodespacesError::new(
                CodespacesErrorKind::UnexpectedFormat,
                format!("Invalid next link {}: {}", next_url, e),
            )
        })?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "per_page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("per_page", &per_page.to_string());

        Ok(Self {
            page,
            per_page,
            url: url.into(),
        })
    }

    /// The URL to request.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn with_query(endpoint: &str, page: u32, per_page: u32) -> CodespacesResult<String> {
    let mut url = url::Url::parse(endpoint).map_err(|e| {
        CodespacesError::new(
            CodespacesErrorKind::InvalidBaseUrl,
            format!("Invalid collection URL {}: {}", endpoint, e),
        )
    })?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &per_page.to_string());
    Ok(url.into())
}

/// Walks a collection page by page, following `next` links.
#[derive(Debug, Clone, Copy)]
pub struct PaginatedLister {
    limit: ListLimit,
    page_size: u32,
}

impl PaginatedLister {
    /// Creates a lister with the given limit and default page size.
    pub fn new(limit: ListLimit, page_size: u32) -> Self {
        Self { limit, page_size }
    }

    /// Cursor for the first request, already shrunk for small limits.
    pub fn first_cursor(&self, endpoint: &str) -> CodespacesResult<PageCursor> {
        PageCursor::first(endpoint, self.limit.page_size(self.page_size, 0))
    }

    /// Fetches pages with `fetch` until the limit is met or no next link remains.
    ///
    /// Any fetch error aborts the walk; records gathered so far are dropped.
    pub async fn collect<T, F, Fut>(&self, first: PageCursor, mut fetch: F) -> CodespacesResult<Vec<T>>
    where
        F: FnMut(PageCursor) -> Fut,
        Fut: Future<Output = CodespacesResult<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut cursor = first;

        loop {
            let page = fetch(cursor.clone()).await?;
            let next = page.links.next.clone();
            let received = page.len();
            items.extend(page.into_items());

            TracingHooks::on_page(cursor.page, cursor.per_page, received, items.len());

            if let ListLimit::AtMost(max) = self.limit {
                if items.len() >= max {
                    items.truncate(max);
                    break;
                }
            }

            let Some(next) = next else {
                break;
            };

            let per_page = self.limit.page_size(self.page_size, items.len());
            cursor = cursor.advance(&next, per_page)?;
        }

        Ok(items)
    }
}

/// Extracts the `page` query parameter from a URL.
pub fn extract_page_number(url: &str) -> Option<u32> {
    url::Url::parse(url).ok().and_then(|u| {
        u.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    })
}
