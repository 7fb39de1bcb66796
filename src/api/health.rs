//! Health check endpoint

use super::AppState;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app_name: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        app_name: state.app_name.to_string(),
    })
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
