//! Integration tests for the LTOS REST client against a local mock device.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use ltos_common::{FetchError, LtosClient, TargetConfig};

const STATUS_BODY: &str = r#"{
    "system-information": {
        "version": "fw_7.10.008",
        "serial-number": "SERIAL123",
        "hostname": "test-device",
        "model": "M600"
    },
    "data": {"rest-api": {"api-version": "20.05.013"}}
}"#;

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

fn json_response(body: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn client_for(url: &str) -> LtosClient {
    LtosClient::new(&TargetConfig {
        timeout_secs: 1.0,
        ..TargetConfig::new(url)
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_status() {
    let url = spawn_mock(Router::new().route("/api/status", get(|| async { json_response(STATUS_BODY) }))).await;
    let client = client_for(&url);

    let document = client.fetch_status().await.unwrap();
    let root = document.root();

    assert_eq!(
        root.str_at(&["system-information", "hostname"]),
        Ok("test-device")
    );
    assert_eq!(
        root.str_at(&["data", "rest-api", "api-version"]),
        Ok("20.05.013")
    );
}

#[tokio::test]
async fn test_fetch_with_trailing_slash_in_base_url() {
    let url = spawn_mock(Router::new().route("/api/status", get(|| async { json_response(STATUS_BODY) }))).await;
    let client = client_for(&format!("{}/", url));

    assert!(client.fetch_status().await.is_ok());
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let router = Router::new().route(
        "/api/status",
        get(|headers: HeaderMap| async move {
            let authorized = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                == Some("Basic YWRtaW46c2VjcmV0");
            if authorized {
                json_response(STATUS_BODY)
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }),
    );
    let url = spawn_mock(router).await;

    let anonymous = client_for(&url);
    let err = anonymous.fetch_status().await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Status { status, .. } if status == reqwest::StatusCode::UNAUTHORIZED
    ));

    let authenticated = LtosClient::new(&TargetConfig {
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
        ..TargetConfig::new(url.as_str())
    })
    .unwrap();
    assert!(authenticated.fetch_status().await.is_ok());
}

#[tokio::test]
async fn test_non_success_status() {
    let router = Router::new().route(
        "/api/status",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let url = spawn_mock(router).await;

    let err = client_for(&url).fetch_status().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { .. }));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_wrong_path_is_not_found() {
    let url = spawn_mock(Router::new().route("/other", get(|| async { json_response(STATUS_BODY) }))).await;

    let err = client_for(&url).fetch_status().await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND
    ));
}

#[tokio::test]
async fn test_malformed_json() {
    let router = Router::new().route(
        "/api/status",
        get(|| async { json_response("{\"system-information\": ") }),
    );
    let url = spawn_mock(router).await;

    let err = client_for(&url).fetch_status().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_non_object_document() {
    let router = Router::new().route("/api/status", get(|| async { json_response("[1, 2, 3]") }));
    let url = spawn_mock(router).await;

    let err = client_for(&url).fetch_status().await.unwrap_err();
    assert!(matches!(err, FetchError::NotAnObject { .. }));
}

#[tokio::test]
async fn test_partial_document_is_not_an_error() {
    let router = Router::new().route("/api/status", get(|| async { json_response("{}") }));
    let url = spawn_mock(router).await;

    let client = client_for(&url);
    let document = client.fetch_status().await.unwrap();
    assert!(document.root().get_opt("system-information").unwrap().is_none());
    assert!(!client.check_health().await.unwrap());
}

#[tokio::test]
async fn test_check_health() {
    let url = spawn_mock(Router::new().route("/api/status", get(|| async { json_response(STATUS_BODY) }))).await;

    assert!(client_for(&url).check_health().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_target() {
    // Grab a free port, then release it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}", addr));
    let err = client.fetch_status().await.unwrap_err();

    assert!(err.is_transport());
    assert!(client.check_health().await.is_err());
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let router = Router::new().route(
        "/api/status",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            json_response(STATUS_BODY)
        }),
    );
    let url = spawn_mock(router).await;

    let started = std::time::Instant::now();
    let err = client_for(&url).fetch_status().await.unwrap_err();

    assert!(err.is_transport());
    assert!(started.elapsed() < Duration::from_secs(4));
}
