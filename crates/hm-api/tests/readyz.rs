use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{body::Body, http::Request, http::StatusCode};
use hm_common::source::StaticSource;
use tower::ServiceExt;

#[tokio::test]
async fn readyz_returns_service_unavailable_when_not_ready() {
    let state = hm_api::test_state(Arc::new(StaticSource::default()));
    state.readiness.store(false, Ordering::SeqCst);
    let app = hm_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn readyz_is_ok_with_loadable_source() {
    let app = hm_api::create_router(hm_api::test_state(Arc::new(StaticSource::default())));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
