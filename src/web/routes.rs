use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
};
use tracing::warn;

use crate::app_state::AppState;

use super::handlers;

/// Applied to every response unless the handler (or the camera) already set them.
const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("cross-origin-resource-policy", "same-origin"),
    ("x-dns-prefetch-control", "off"),
];

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/api", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/time", get(handlers::time))
        .route("/api/video-proxy", get(handlers::video_proxy))
        .route("/api/video-proxy/status", get(handlers::video_proxy_status));

    if let Some(dir) = &state.config.static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    let mut router = router
        .layer(middleware::from_fn(super::middleware::log_requests))
        .with_state(state.clone());

    if let Some(cors) = cors_layer(&state.config.cors_origins) {
        router = router.layer(cors);
    }
    router
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring invalid CORS origin {origin:?}: {err}");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET]),
    )
}
