//! Shared helpers for mock-server tests.

#![allow(dead_code)]

use integrations_codespaces::CodespacesClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Offset between consecutive pages of the fake collection.
pub const PAGE_STRIDE: usize = 100;

/// Client pointed at `server` with no delay between retries.
pub fn client_for(server: &MockServer) -> CodespacesClient {
    CodespacesClient::builder()
        .base_url(server.uri())
        .retry_delay(Duration::ZERO)
        .build()
        .expect("client builds")
}

/// Codespace records named `codespace-{start}` to `codespace-{end - 1}`.
pub fn codespace_list(start: usize, end: usize) -> Vec<Value> {
    (start..end)
        .map(|i| json!({ "name": format!("codespace-{}", i) }))
        .collect()
}

/// Query parameters of a received request.
pub fn query_of(request: &Request) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}

/// Three-page `/user/codespaces` collection.
///
/// Page 1 and 2 hold `per_page` records and link onward, page 3 holds half a
/// page and no next link. Page 1 reports `initial_total`, later pages
/// `final_total`. Any other page, or `fail_page`, answers 500.
pub struct FakeCodespacesApi {
    pub base: String,
    pub initial_total: usize,
    pub final_total: usize,
    pub fail_page: Option<u32>,
}

impl FakeCodespacesApi {
    pub fn new(server: &MockServer, initial_total: usize, final_total: usize) -> Self {
        Self {
            base: server.uri(),
            initial_total,
            final_total,
            fail_page: None,
        }
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.fail_page = Some(page);
        self
    }

    fn link(&self, page: u32, per_page: usize, rel: &str) -> String {
        format!(
            r#"<{}/user/codespaces?page={}&per_page={}>; rel="{}""#,
            self.base, page, per_page, rel
        )
    }
}

impl Respond for FakeCodespacesApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let query = query_of(request);
        let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let per_page: usize = query
            .get("per_page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        if self.fail_page == Some(page) {
            return ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" }));
        }

        let start = (page as usize - 1) * PAGE_STRIDE;
        let (end, total, link) = match page {
            1 => (
                start + per_page,
                self.initial_total,
                Some(format!(
                    "{}, {}",
                    self.link(3, per_page, "last"),
                    self.link(2, per_page, "next")
                )),
            ),
            2 => (
                start + per_page,
                self.final_total,
                Some(self.link(3, per_page, "next")),
            ),
            3 => (start + per_page / 2, self.final_total, None),
            _ => {
                return ResponseTemplate::new(500)
                    .set_body_json(json!({ "message": "should not fetch extra page" }))
            }
        };

        let body = json!({
            "codespaces": codespace_list(start, end),
            "total_count": total,
        });

        let template = ResponseTemplate::new(200).set_body_json(body);
        match link {
            Some(link) => template.insert_header("Link", link.as_str()),
            None => template,
        }
    }
}
