//! Codespace listing, fetching and editing against a mock server.

mod common;

use common::{client_for, query_of, FakeCodespacesApi};
use integrations_codespaces::{
    Codespace, CodespacesClient, CodespacesErrorKind, EditCodespaceParams, ListLimit,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_list(server: &MockServer, api: FakeCodespacesApi) {
    Mock::given(method("GET"))
        .and(path("/user/codespaces"))
        .respond_with(api)
        .mount(server)
        .await;
}

async fn requested_page_sizes(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| query_of(r).get("per_page").cloned().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_list_limited() {
    let server = MockServer::start().await;
    mount_list(&server, FakeCodespacesApi::new(&server, 200, 200)).await;
    let client = client_for(&server);

    let codespaces = client
        .codespaces()
        .list(200, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespaces.len(), 200);
    assert_eq!(codespaces[0].name, "codespace-0");
    assert_eq!(codespaces[199].name, "codespace-199");
    assert_eq!(requested_page_sizes(&server).await, vec!["100", "100"]);
}

#[tokio::test]
async fn test_list_unlimited_follows_next_links() {
    let server = MockServer::start().await;
    mount_list(&server, FakeCodespacesApi::new(&server, 200, 200)).await;
    let client = client_for(&server);

    let codespaces = client
        .codespaces()
        .list(-1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespaces.len(), 250);
    assert_eq!(codespaces[0].name, "codespace-0");
    assert_eq!(codespaces[249].name, "codespace-249");
    assert_eq!(client.metrics().pages_fetched, 3);
}

#[tokio::test]
async fn test_list_shrinks_final_page_to_remainder() {
    let server = MockServer::start().await;
    mount_list(&server, FakeCodespacesApi::new(&server, 200, 200)).await;
    let client = client_for(&server);

    let codespaces = client
        .codespaces()
        .list_with_limit(ListLimit::AtMost(150), &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<_> = codespaces.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names.len(), 150);
    assert_eq!(names[100], "codespace-100");
    assert_eq!(names[149], "codespace-149");
    assert_eq!(requested_page_sizes(&server).await, vec!["100", "50"]);
}

#[tokio::test]
async fn test_list_small_limit_single_request() {
    let server = MockServer::start().await;
    mount_list(&server, FakeCodespacesApi::new(&server, 200, 200)).await;
    let client = client_for(&server);

    let codespaces = client
        .codespaces()
        .list(30, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespaces.len(), 30);
    assert_eq!(requested_page_sizes(&server).await, vec!["30"]);
}

#[tokio::test]
async fn test_list_page_reports_total_and_links() {
    let server = MockServer::start().await;
    mount_list(&server, FakeCodespacesApi::new(&server, 200, 250)).await;
    let client = client_for(&server);
    let service = client.codespaces();
    let endpoint = format!("{}/user/codespaces", server.uri());
    let cursor = integrations_codespaces::PageCursor::first(&endpoint, 100).unwrap();

    let page = service
        .list_page(&cursor, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.len(), 100);
    assert_eq!(page.total_count, Some(200));
    assert!(page.has_next());
    assert_eq!(page.links.total_pages(), Some(3));
}

#[tokio::test]
async fn test_list_accepts_blank_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "codespaces": [
                { "name": "codespace-0", "created_at": "2021-09-22T18:23:45Z", "last_used_at": "2021-09-23T08:00:00Z" },
                { "name": "codespace-1", "created_at": "", "last_used_at": "" }
            ],
            "total_count": 2
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let codespaces = client
        .codespaces()
        .list(-1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespaces.len(), 2);
    assert!(codespaces[0].last_used_at.is_some());
    assert_eq!(codespaces[1].last_used_at, None);
}

#[tokio::test]
async fn test_list_failure_discards_partial_results() {
    let server = MockServer::start().await;
    mount_list(&server, FakeCodespacesApi::new(&server, 200, 200).failing_on(2)).await;
    let client = client_for(&server);

    let err = client
        .codespaces()
        .list(-1, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), CodespacesErrorKind::InternalError);
    assert_eq!(err.message(), "boom");
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_get_retries_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "test_codespace",
            "created_at": "",
            "last_used_at": "",
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let codespace = client
        .codespaces()
        .get("test", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespace.name, "test_codespace");
    assert_eq!(server.received_requests().await.unwrap().len(), 4);

    let metrics = client.metrics();
    assert_eq!(metrics.requests_total, 4);
    assert_eq!(metrics.requests_retried, 3);
    assert_eq!(metrics.requests_success, 1);
}

#[tokio::test]
async fn test_get_without_retry_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "test_codespace" })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let codespace = client
        .codespaces()
        .get("test", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespace.name, "test_codespace");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = client
        .codespaces()
        .get("test", false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), CodespacesErrorKind::BadGateway);
    assert_eq!(err.status_code(), Some(502));
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_get_client_error_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest/codespaces"
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = client
        .codespaces()
        .get("missing", false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), CodespacesErrorKind::NotFound);
    assert_eq!(err.message(), "Not Found");
    assert_eq!(
        err.documentation_url(),
        Some("https://docs.github.com/rest/codespaces")
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_with_connection_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .and(query_param("internal", "true"))
        .and(query_param("refresh", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "test",
            "connection": { "sessionId": "abc", "hostPublicKeys": ["key"] }
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let codespace = client
        .codespaces()
        .get("test", true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespace.connection.session_id, "abc");
    assert_eq!(codespace.connection.host_public_keys, vec!["key".to_string()]);
}

#[tokio::test]
async fn test_get_malformed_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = client
        .codespaces()
        .get("test", false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), CodespacesErrorKind::DeserializationError);
}

#[tokio::test]
async fn test_get_cancelled_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "name": "test" }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let client = client_for(&server);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .codespaces()
        .get("test", false, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(err.status_code().is_none());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_edit_codespace() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/user/codespaces/test"))
        .and(body_json(json!({ "display_name": "changeTo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "display_name": "changeTo" })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let codespace = client
        .codespaces()
        .edit(
            "test",
            &EditCodespaceParams::display_name("changeTo"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        codespace,
        Codespace {
            display_name: "changeTo".to_string(),
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn test_edit_requires_a_change() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let err = client
        .codespaces()
        .edit("test", &EditCodespaceParams::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), CodespacesErrorKind::InvalidParameter);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auth_header_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "test" })))
        .mount(&server)
        .await;
    let client = CodespacesClient::builder()
        .base_url(server.uri())
        .pat("ghp_test")
        .build()
        .unwrap();

    let codespace = client
        .codespaces()
        .get("test", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codespace.name, "test");
}

#[tokio::test]
async fn test_cancelled_while_reading_error_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(
                b"HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"mess",
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = CodespacesClient::builder()
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .codespaces()
        .get("test", false, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_retries_counted_when_cancelled_mid_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/codespaces/test"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let client = CodespacesClient::builder()
        .base_url(server.uri())
        .retry_delay(Duration::from_secs(60))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = client
        .codespaces()
        .get("test", false, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(client.metrics().requests_retried, 1);
}
