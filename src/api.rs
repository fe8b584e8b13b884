use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    center::NotificationCenter,
    clients::storage::SessionStorage,
    config::Config,
    models::{health::HealthStatus, response::ApiResponse},
};

pub fn router<S: SessionStorage>(center: Arc<NotificationCenter<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check::<S>))
        .route(
            "/notifications",
            get(list_notifications::<S>).delete(clear_all_notifications::<S>),
        )
        .route("/notifications/read-all", post(mark_all_as_read::<S>))
        .route("/notifications/test", post(send_test_notification::<S>))
        .route("/notifications/{id}", delete(clear_notification::<S>))
        .route("/notifications/{id}/read", post(mark_as_read::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(center)
}

pub async fn run_api_server<S: SessionStorage>(
    config: &Config,
    center: Arc<NotificationCenter<S>>,
) -> Result<(), Error> {
    let app = router(Arc::clone(&center));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;

    info!(address = %addr, "Notification API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    center.unmount().await;

    Ok(())
}

async fn health_check<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
) -> impl IntoResponse {
    let health = center.health().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn list_notifications<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
) -> impl IntoResponse {
    let feed = center.feed().await;

    Json(ApiResponse::success(
        feed,
        "Notifications retrieved".to_string(),
    ))
}

async fn mark_as_read<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let message = if center.mark_as_read(&id).await {
        "Notification marked as read"
    } else {
        "Notification not found or already read"
    };

    Json(ApiResponse::success(center.feed().await, message.to_string()))
}

async fn mark_all_as_read<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
) -> impl IntoResponse {
    center.mark_all_as_read().await;

    Json(ApiResponse::success(
        center.feed().await,
        "All notifications marked as read".to_string(),
    ))
}

async fn clear_notification<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let message = if center.clear_notification(&id).await {
        "Notification cleared"
    } else {
        "Notification not found"
    };

    Json(ApiResponse::success(center.feed().await, message.to_string()))
}

async fn clear_all_notifications<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
) -> impl IntoResponse {
    center.clear_all_notifications().await;

    Json(ApiResponse::success(
        center.feed().await,
        "All notifications cleared".to_string(),
    ))
}

async fn send_test_notification<S: SessionStorage>(
    State(center): State<Arc<NotificationCenter<S>>>,
) -> impl IntoResponse {
    match center.send_test_notification().await {
        Some(_) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::success(
                (),
                "Test notification requested".to_string(),
            )),
        ),
        None => (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(
                "No subscriber".to_string(),
                "Cannot request a test notification without a subscriber".to_string(),
            )),
        ),
    }
}
