//! Notes API - REST server
//!
//! Email/password accounts with JWT access and refresh tokens, and a
//! per-user note collection behind Bearer authentication.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notes;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware, Router,
};
use notes_core::{AppConfig, PasswordConfig, ServerConfig};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa_swagger_ui::SwaggerUi;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let http_layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors_layer(server));

    Router::new()
        .merge(routes::api_routes(state.clone()))
        .merge(routes::health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(http_layers)
        .with_state(state)
}

/// CORS policy: only the configured origins, none when the list is empty
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let origins = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        });

    cors.allow_origin(AllowOrigin::list(origins))
}

/// Configuration for tests: fixed secret and cheap password hashing
#[doc(hidden)]
pub fn testing_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some("notes-api-test-secret".to_string());
    config.auth.password = PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: Some(32),
    };
    config
}

/// Router over a fresh in-memory store, for tests
#[doc(hidden)]
pub fn create_router_for_testing() -> Router {
    match AppState::in_memory(testing_config()) {
        Ok(state) => create_router(Arc::new(state)),
        Err(e) => panic!("testing config must build: {e}"),
    }
}
