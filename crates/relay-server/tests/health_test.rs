//! Liveness endpoint behavior.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use relay_sync::{RunReport, SyncError, SyncService};
use relay_server::{AppState, create_router, create_router_with_state};
use tower::ServiceExt;

async fn get_health(app: Router) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_reports_up_with_service_identity() {
    let (status, body) = get_health(create_router()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["service"], "relay-server");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

struct IdleService;

#[async_trait]
impl SyncService for IdleService {
    async fn run(&self) -> Result<RunReport, SyncError> {
        Ok(RunReport::no_changes())
    }
}

#[tokio::test]
async fn health_is_served_by_the_stateful_router() {
    let state = AppState::new(Arc::new(IdleService));
    let (status, body) = get_health(create_router_with_state(state)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
}
