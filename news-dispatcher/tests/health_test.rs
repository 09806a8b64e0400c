use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use news_dispatcher::health::{router, BANNER};
use tower::ServiceExt;

async fn get(path: &str) -> (StatusCode, serde_json::Value) {
    let response = router()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_route() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "OK" }));
}

#[tokio::test]
async fn test_banner_route() {
    let (status, body) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::Value::String(BANNER.to_string()));
}

#[tokio::test]
async fn test_unknown_route() {
    let response = router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
