use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use hm_common::source::StaticSource;
use http_body_util::BodyExt;
use tower::ServiceExt;

#[tokio::test]
async fn banner_healthz_and_livez_respond() {
    let state = hm_api::test_state(Arc::new(StaticSource::default()));
    let app = hm_api::create_router(state);

    let banner = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(banner.status(), StatusCode::OK);
    let text = banner.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&text[..], b"Handyman matching API is running");

    let healthz = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(healthz.status(), StatusCode::OK);
    let bytes = healthz.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["ok"], true);

    let livez = app
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(livez.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = hm_api::create_router(hm_api::test_state(Arc::new(StaticSource::default())));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/diagnose")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
