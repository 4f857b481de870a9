//! fhir-synth library crate
//!
//! Exposes the pipeline pieces, `build_app` and the REPL so integration
//! tests can drive them without a network or a terminal.
//! The binary entrypoint is in `main.rs`.

pub mod agent;
pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
mod middleware;
pub mod pipeline;
pub mod rag;
mod routes;
pub mod startup;
pub mod tools;

use axum::{
    Extension, Router, middleware as axum_mw,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use startup::Components;

pub use middleware::REQUEST_ID_HEADER;

/// Build the web router with all routes and middleware.
///
/// Separate from `main()` so integration tests can drive the app without
/// binding to a TCP port.
pub fn build_app(components: Components, config: &Config) -> Router {
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Generation calls the model; these routes are rate limited
    let generation_routes = Router::new()
        .route("/generate", post(routes::generate::form))
        .route("/api/generate", post(routes::generate::api))
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // build_recorder() + set_global_recorder() so repeated calls (tests)
    // keep working; only the first install wins.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(public_routes)
        .merge(generation_routes)
        .with_state(components)
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
