//! ConversationRelay WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for a ConversationRelay call
///
/// # Example
///
/// ```json
/// // Provider announces the call
/// {"type": "setup", "callSid": "CA0123"}
///
/// // Provider sends transcribed speech
/// {"type": "prompt", "voicePrompt": "What's the forecast for milk?", "last": true}
///
/// // Server replies with text to speak
/// {"type": "text", "token": "Milk demand should hold steady this week.", "last": true}
/// ```
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
