//! HTTP API
//!
//! - `GET /health`: liveness
//! - `POST /getSession`: issue a client session id
//! - `POST /chat`: refined answer as JSON
//! - `POST /chatStream`: refined answer as server-sent events

pub mod chat;
pub mod health;

use axum::Router;
use std::sync::Arc;
use wayfarer_core::Concierge;

pub use chat::chat_routes;
pub use health::health_routes;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub concierge: Arc<Concierge>,
    pub app_name: Arc<str>,
}

impl AppState {
    pub fn new(concierge: Arc<Concierge>, app_name: &str) -> Self {
        Self {
            concierge,
            app_name: Arc::from(app_name),
        }
    }
}

/// Create the API router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(chat_routes())
        .with_state(state)
}
