use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use tower::ServiceExt;

use super::support::router;
use crate::auth::service::MockAuthService;
use crate::routes::paths;

const LOCAL_ORIGIN: &str = "http://localhost:3000";

fn preflight(path: &str, origin: &str, method: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri(path)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, method)
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn allowed_preflight_echoes_origin() {
    let response = router(MockAuthService::new())
        .oneshot(preflight(paths::SIGN_IN, LOCAL_ORIGIN, "POST"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        LOCAL_ORIGIN
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "content-type"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "3600");
}

#[tokio::test]
async fn unknown_origin_is_forbidden_without_cors_headers() {
    let response = router(MockAuthService::new())
        .oneshot(preflight(paths::SIGN_IN, "http://evil.example.com", "POST"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn simple_request_from_allowed_origin_gets_cors_headers() {
    let request = Request::builder()
        .uri(paths::HEALTH)
        .header(header::ORIGIN, LOCAL_ORIGIN)
        .body(Body::empty())
        .unwrap();

    let response = router(MockAuthService::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        LOCAL_ORIGIN
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS],
        "location"
    );
}

#[tokio::test]
async fn same_origin_requests_skip_the_allow_list() {
    let request = Request::builder()
        .uri(paths::INFO)
        .header(header::HOST, "api.greencloud.io")
        .header(header::ORIGIN, "https://api.greencloud.io")
        .body(Body::empty())
        .unwrap();

    let response = router(MockAuthService::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn actuator_is_read_only_cross_origin() {
    let response = router(MockAuthService::new())
        .oneshot(preflight(paths::HEALTH, LOCAL_ORIGIN, "POST"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router(MockAuthService::new())
        .oneshot(preflight(paths::HEALTH, LOCAL_ORIGIN, "GET"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        LOCAL_ORIGIN
    );
}
