use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Sprout Voice Assistant";

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub websocket_url: String,
    /// Calls set up and not yet disconnected
    pub active_sessions: usize,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{SERVICE_NAME} API is running"),
        status: "healthy".to_string(),
    })
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        websocket_url: state.config.websocket_url(),
        active_sessions: state.sessions.size(),
    })
}
