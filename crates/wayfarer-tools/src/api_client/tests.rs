use super::*;
use crate::test_support::spawn_server;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Stub {
    token_hits: AtomicUsize,
    expires_in: i64,
}

async fn token(
    State(stub): State<Arc<Stub>>,
    Form(form): Form<HashMap<String, String>>,
) -> std::result::Result<Json<Value>, StatusCode> {
    if form.get("grant_type").map(String::as_str) != Some("client_credentials")
        || form.get("client_secret").map(String::as_str) != Some("s3cret")
    {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let n = stub.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
    // widen the window for concurrent callers
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    Ok(Json(json!({ "access_token": format!("tok-{n}"), "expires_in": stub.expires_in })))
}

async fn whoami(headers: HeaderMap) -> std::result::Result<Json<Value>, StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !auth.starts_with("Bearer tok-") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({ "auth": auth })))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, r#"{"errors":[{"detail":"boom"}]}"#)
}

async fn keyed(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "header": headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        "host": headers.get("x-api-host").and_then(|v| v.to_str().ok()),
        "key": query.get("key"),
        "q": query.get("q"),
    }))
}

async fn oauth_server(expires_in: i64) -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub {
        token_hits: AtomicUsize::new(0),
        expires_in,
    });
    let app = Router::new()
        .route("/v1/security/oauth2/token", post(token))
        .route("/v1/whoami", get(whoami))
        .route("/v1/broken", get(broken))
        .with_state(stub.clone());
    (spawn_server(app).await, stub)
}

fn oauth_client(base_url: &str, secret: &str) -> ApiClient {
    ApiClient::new(
        "amadeus",
        base_url,
        Credentials::ClientCredentials {
            token_url: "/v1/security/oauth2/token".to_string(),
            client_id: "client".to_string(),
            client_secret: SecretString::from(secret.to_string()),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let (base, stub) = oauth_server(1799).await;
    let client = oauth_client(&base, "s3cret");

    let first = client.get("/v1/whoami", &[]).await.unwrap();
    let second = client.get("/v1/whoami", &[]).await.unwrap();

    assert_eq!(first["auth"], "Bearer tok-1");
    assert_eq!(second["auth"], "Bearer tok-1");
    assert_eq!(stub.token_hits.load(Ordering::SeqCst), 1);

    let token = client.bearer_token().await.unwrap();
    assert!(token.expires_at > Utc::now() + ChronoDuration::seconds(1700));
}

#[tokio::test]
async fn test_token_inside_refresh_margin_is_refetched() {
    // 30s lifetime is already inside the 60s margin
    let (base, stub) = oauth_server(30).await;
    let client = oauth_client(&base, "s3cret");

    client.get("/v1/whoami", &[]).await.unwrap();
    let second = client.get("/v1/whoami", &[]).await.unwrap();

    assert_eq!(second["auth"], "Bearer tok-2");
    assert_eq!(stub.token_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_oversized_expires_in_is_clamped() {
    let (base, _stub) = oauth_server(i64::MAX).await;
    let client = oauth_client(&base, "s3cret");

    let reply = client.get("/v1/whoami", &[]).await.unwrap();
    assert_eq!(reply["auth"], "Bearer tok-1");

    let token = client.bearer_token().await.unwrap();
    assert!(token.expires_at <= Utc::now() + ChronoDuration::seconds(MAX_TOKEN_LIFETIME_SECS));
}

#[test]
fn test_token_expiry_bounds() {
    let now = Utc::now();
    assert_eq!(
        token_expiry(now, 1799),
        Some(now + ChronoDuration::seconds(1799 - TOKEN_REFRESH_MARGIN_SECS))
    );
    assert_eq!(
        token_expiry(now, i64::MAX),
        Some(now + ChronoDuration::seconds(MAX_TOKEN_LIFETIME_SECS - TOKEN_REFRESH_MARGIN_SECS))
    );
    // negative lifetimes are already expired
    assert!(token_expiry(now, i64::MIN).is_some_and(|at| at < now));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let (base, stub) = oauth_server(1799).await;
    let client = Arc::new(oauth_client(&base, "s3cret"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get("/v1/whoami", &[]).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap()["auth"], "Bearer tok-1");
    }
    assert_eq!(stub.token_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_error_keeps_status_and_body() {
    let (base, _stub) = oauth_server(1799).await;
    let client = oauth_client(&base, "s3cret");

    let err = client.get("/v1/broken", &[]).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    match err {
        Error::Upstream { service, body, .. } => {
            assert_eq!(service, "amadeus");
            assert!(body.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_auth_error() {
    let (base, stub) = oauth_server(1799).await;
    let client = oauth_client(&base, "wrong");

    let err = client.get("/v1/whoami", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(stub.token_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_api_key_header_and_query_param() {
    let app = Router::new().route("/search", get(keyed));
    let base = spawn_server(app).await;
    let client = ApiClient::new(
        "rail",
        &base,
        Credentials::ApiKey {
            header: "x-api-key".to_string(),
            key: SecretString::from("k-123".to_string()),
        },
    )
    .unwrap()
    .with_header("x-api-host", "rail.example");

    let by_header = client
        .send(ApiRequest::get("/search").with_query("q", "goa"))
        .await
        .unwrap();
    assert_eq!(by_header["header"], "k-123");
    assert_eq!(by_header["host"], "rail.example");
    assert_eq!(by_header["q"], "goa");
    assert!(by_header["key"].is_null());

    let by_param = client
        .send(ApiRequest::get(format!("{base}/search")).with_key_param("key"))
        .await
        .unwrap();
    assert_eq!(by_param["key"], "k-123");
    assert!(by_param["header"].is_null());

    assert!(matches!(
        client.bearer_token().await,
        Err(Error::NotConfigured(_))
    ));
}

#[test]
fn test_debug_output_hides_secrets() {
    let credentials = Credentials::ClientCredentials {
        token_url: "/token".into(),
        client_id: "id".into(),
        client_secret: SecretString::from("hunter2".to_string()),
    };
    let token = AuthToken {
        access_token: "abc-token".into(),
        expires_at: Utc::now(),
    };
    assert!(!format!("{credentials:?}").contains("hunter2"));
    assert!(!format!("{token:?}").contains("abc-token"));
}
