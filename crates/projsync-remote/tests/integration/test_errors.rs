//! HTTP failure classification

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use projsync_core::domain::newtypes::RemoteId;
use projsync_core::ports::{IRemoteStore, RemoteError};
use projsync_remote::{ApiClient, HttpRemoteStore};

use crate::common::{self, DOCS_PATH};

async fn list_error(response: ResponseTemplate) -> RemoteError {
    let (server, store) = common::setup_store_mock().await;
    common::mount_docs_failure(&server, response).await;
    store.list_files(&common::scope()).await.unwrap_err()
}

#[tokio::test]
async fn test_429_carries_retry_after() {
    let err = list_error(ResponseTemplate::new(429).insert_header("Retry-After", "42")).await;

    let RemoteError::RateLimited {
        retry_after,
        resets_at,
    } = err
    else {
        panic!("expected rate limit, got {err:?}");
    };
    assert_eq!(retry_after, Some(Duration::from_secs(42)));
    assert!(resets_at.is_some());
}

#[tokio::test]
async fn test_429_without_header() {
    let err = list_error(ResponseTemplate::new(429)).await;
    assert_eq!(
        err,
        RemoteError::RateLimited {
            retry_after: None,
            resets_at: None
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_403_is_transient_forbidden() {
    let err = list_error(ResponseTemplate::new(403).set_body_string("session expired")).await;
    assert_eq!(
        err,
        RemoteError::Forbidden("HTTP 403: session expired".to_string())
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_503_is_unavailable() {
    let err = list_error(ResponseTemplate::new(503)).await;
    assert!(matches!(err, RemoteError::Unavailable(_)));
}

#[tokio::test]
async fn test_401_is_permanent() {
    let err = list_error(ResponseTemplate::new(401)).await;
    assert!(matches!(err, RemoteError::Unauthorized(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let err = list_error(ResponseTemplate::new(200).set_body_string("<html>login</html>")).await;
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_delete_of_missing_document_is_not_found() {
    let (server, store) = common::setup_store_mock().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS_PATH}/gone")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store
        .delete_file(&common::scope(), &RemoteId::new("gone").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::NotFound("HTTP 404".to_string()));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let (server, _) = common::setup_store_mock().await;
    common::mount_docs_failure(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!([]))
            .set_delay(Duration::from_secs(2)),
    )
    .await;
    let client = ApiClient::new(server.uri(), common::SESSION_KEY, Duration::from_millis(100)).unwrap();
    let store = HttpRemoteStore::new(client);

    let err = store.list_files(&common::scope()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let store = HttpRemoteStore::new(ApiClient::with_base_url("k", "http://127.0.0.1:1"));
    let err = store.list_files(&common::scope()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}
