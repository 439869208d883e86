use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /: status banner matching the original server surface.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "convert-service conversion server is running"
    }))
}

/// GET /health: degrades to 503 when the scratch directory cannot be
/// created, since every conversion stages files there.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::create_dir_all(&state.config.converter.scratch_dir).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "convert-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "convert-service",
                "error": e.to_string()
            })),
        ),
    }
}

/// GET /metrics: Prometheus text format for scraping.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
