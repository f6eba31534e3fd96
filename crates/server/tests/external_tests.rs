//! Tests for datastreams whose content lives outside the repository.

mod common;

use axum::http::{Method, StatusCode, header};
use common::*;
use httpmock::prelude::*;
use portico_core::config::AppConfig;
use portico_repo::DatastreamInfo;

fn external_app(location: String, token: Option<&str>) -> TestApp {
    let mut config = AppConfig::for_testing();
    config.download.external_token = token.map(str::to_string);
    let app = TestApp::with_config(config, None);
    app.repo
        .set("ext", "rightsMetadata", public_rights().into_bytes());
    // placeholder body; the real bytes live at the external location
    app.repo.set("ext", "content", &b""[..]);
    app.repo.set_info(
        "ext",
        "content",
        DatastreamInfo {
            label: "file.bin".to_string(),
            version_id: "content.1".to_string(),
            mime_type: "application/octet-stream".to_string(),
            location: Some(location),
            location_type: Some("URL".to_string()),
            ..DatastreamInfo::default()
        },
    );
    app
}

#[tokio::test]
async fn external_content_fetched_with_api_key() {
    let server = MockServer::start();
    let head = server.mock(|when, then| {
        when.method("HEAD").path("/item/file");
        then.status(200).header("content-length", "5");
    });
    let get = server.mock(|when, then| {
        when.method(GET)
            .path("/item/file")
            .header("x-api-key", "sesame");
        then.status(206).body("hello");
    });

    let app = external_app(server.url("/item/file"), Some("sesame"));
    let resp = app.get("/ext").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ETAG], "\"content.1\"");
    assert_eq!(body_of(resp).await, b"hello");
    head.assert();
    get.assert();
}

#[tokio::test]
async fn range_request_fetches_only_the_tail() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("HEAD").path("/item/file");
        then.status(200).header("content-length", "5");
    });
    let get = server.mock(|when, then| {
        when.method(GET)
            .path("/item/file")
            .header("range", "bytes=1-4");
        then.status(206).body("ello");
    });

    let app = external_app(server.url("/item/file"), Some("sesame"));
    let resp = app
        .request(Method::GET, "/ext", &[("range", "bytes=1-3")])
        .await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes 1-3/5");
    assert_eq!(body_of(resp).await, b"ell");
    get.assert();
}

#[tokio::test]
async fn missing_external_content_is_404() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("HEAD").path("/item/file");
        then.status(404);
    });

    let app = external_app(server.url("/item/file"), Some("sesame"));
    let resp = app.get("/ext").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn without_a_token_the_repository_copy_is_served() {
    // unreachable external location; it must never be contacted
    let app = external_app("http://localhost:1/item/file".to_string(), None);
    app.repo.set("ext", "content", &b"hello"[..]);

    let resp = app.get("/ext").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_of(resp).await, b"hello");
}
