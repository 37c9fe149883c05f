use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, twiml};
use crate::state::AppState;
use std::sync::Arc;

/// Create the public HTTP router: status endpoints and the TwiML webhook
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health_check))
        .route("/twiml", post(twiml::twiml_handler))
        .layer(TraceLayer::new_for_http())
}
