//! Middleware behavior through the assembled router (no database needed)

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{bearer, body_json, dev_app, dev_state, get, json_request, test_env_app, with_auth};

#[tokio::test]
async fn test_xss_payload_is_escaped() {
    let response = dev_app()
        .oneshot(json_request(
            "POST",
            "/api/v1/test/xss",
            json!({ "name": "Test <script>alert(1)</script>", "nested": { "list": ["<b>"] } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["receivedData"]["name"],
        "Test &lt;script&gt;alert(1)&lt;&#x2F;script&gt;"
    );
    assert_eq!(body["receivedData"]["nested"]["list"][0], "&lt;b&gt;");
    assert_eq!(body["_version"], "1");
}

#[tokio::test]
async fn test_unsupported_path_version_rejected() {
    let response = dev_app()
        .oneshot(get("/api/v2/test/version"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["requestedVersion"], "2");
    assert_eq!(body["supportedVersions"], json!(["1"]));
}

#[tokio::test]
async fn test_unsupported_accept_version_rejected() {
    let request = Request::builder()
        .uri("/api/test/version")
        .header("accept", "application/vnd.mesa.v2+json")
        .body(Body::empty())
        .unwrap();
    let response = dev_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_version_header_on_legacy_alias() {
    let request = Request::builder()
        .uri("/api/test/version")
        .header("x-api-version", "v1")
        .body(Body::empty())
        .unwrap();
    let response = dev_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-api-version"], "1");
    let body = body_json(response).await;
    assert_eq!(body["version"], "1");
    assert!(body["_timestamp"].is_string());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let response = dev_app()
        .oneshot(get("/api/v1/test/version"))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let response = dev_app().oneshot(get("/api/v1/auth/me")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn test_group_auth_rejects_garbage_token() {
    let request = Request::builder()
        .uri("/api/v1/locations")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = dev_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = dev_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_auth_rate_limit_in_development() {
    let app = dev_app();
    let attempt = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from("not json"))
            .unwrap()
    };

    for _ in 0..50 {
        let response = app.clone().oneshot(attempt()).await.unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    let response = app.clone().oneshot(attempt()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = body_json(response).await;
    assert_eq!(body["error"], "Too many requests");

    // A different client still has budget
    let other = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.8")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(other).await.unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_error_route_exposes_debug_in_development() {
    let response = dev_app().oneshot(get("/api/v1/test/error")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], 9001);
    assert!(
        body["details"]["debug"]
            .as_str()
            .is_some_and(|d| d.contains("Intentional failure"))
    );
}

#[tokio::test]
async fn test_error_detail_redacted_outside_development() {
    let response = test_env_app()
        .oneshot(get("/api/v1/test/error"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], 9001);
    assert!(body.get("details").is_none());
    assert_eq!(body["_version"], "1");
}

#[tokio::test]
async fn test_bad_query_string_is_invalid_request() {
    let state = dev_state();
    let auth = bearer(&state, 7, Some(1), &["waiter"]);
    let app = mesa_cloud::api::create_router(state);

    for uri in ["/api/v1/menu/items?available=maybe", "/api/v1/orders?page=abc"] {
        let response = app
            .clone()
            .oneshot(with_auth(get(uri), &auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["code"], 5, "{uri}");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = dev_app().oneshot(get("/api/v1/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], 3);
    assert_eq!(response_version(&body), Some("1"));
}

fn response_version(body: &serde_json::Value) -> Option<&str> {
    body["_version"].as_str()
}
