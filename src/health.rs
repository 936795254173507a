use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

pub async fn health_check_handler(State(state): State<AppState>) -> Response {
    tracing::info!("health_check started");

    let store = Arc::clone(&state.store);
    let ping = tokio::task::spawn_blocking(move || store.ping()).await;

    match ping {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "Store connection is healthy"
            })),
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!("health_check store error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "fail",
                    "message": "Store is unreachable"
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("health_check task error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "fail",
                    "message": "Health check failed"
                })),
            )
                .into_response()
        }
    }
}
