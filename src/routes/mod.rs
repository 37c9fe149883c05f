pub mod api;
pub mod relay;

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::{Router, middleware};
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// Rates at or above this disable the limiter
pub const RATE_LIMIT_DISABLED_AT: u32 = 100_000;

/// Interval after which one request of a client's quota is replenished.
pub fn replenish_period(requests_per_second: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(requests_per_second.max(1)))
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    match origins {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(false),
        Some(list) => {
            let origins: Vec<HeaderValue> = list
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            // No allow_origin: browsers block cross-origin requests
            CorsLayer::new()
                .allow_methods(methods)
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(false)
        }
    }
}

/// Build the complete application router
///
/// Merges the API routes with the relay route (behind the connection limit)
/// and applies CORS, the per-IP rate limiter and the security headers.
pub fn create_app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let rate_limit_rps = state.config.rate_limit_requests_per_second;
    let rate_limit_burst = state.config.rate_limit_burst_size;
    let cors_origins = state.config.cors_allowed_origins.clone();

    let relay_routes = relay::create_relay_router().layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));

    let governor_layer = if rate_limit_rps < RATE_LIMIT_DISABLED_AT {
        let governor_config = GovernorConfigBuilder::default()
            .period(replenish_period(rate_limit_rps))
            .burst_size(rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;
        info!(
            requests_per_second = rate_limit_rps,
            burst = rate_limit_burst,
            "Rate limiting enabled"
        );
        Some(GovernorLayer::new(governor_config))
    } else {
        info!("Rate limiting disabled (rate >= {RATE_LIMIT_DISABLED_AT}/s)");
        None
    };

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    Ok(api::create_api_router()
        .merge(relay_routes)
        .with_state(state)
        .layer(cors_layer(cors_origins.as_deref()))
        .layer(tower::util::option_layer(governor_layer))
        .layer(security_headers))
}
