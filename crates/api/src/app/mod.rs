//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(&config).await?);
    Ok(build_router(services, &config))
}

/// Router over already-built services.
pub fn build_router(services: Arc<services::AppServices>, config: &AppConfig) -> Router {
    let auth_state = middleware::AuthState {
        identity: services.identity.clone(),
        request_timeout: config.request_timeout,
    };

    // Protected routes: require a valid token.
    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let mut public = routes::public_router();
    if config.dev_mode {
        tracing::warn!("development mode: POST /dev/tokens mints tokens without login");
        public = public.nest("/dev", routes::auth::dev_router());
    }

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(axum::middleware::from_fn_with_state(
                    config.request_timeout,
                    middleware::scope_middleware,
                )),
        )
}
