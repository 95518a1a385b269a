pub mod health;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;
use crate::users::handlers;
use crate::webhook::handlers::handle_webhook;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Identity-provider ingress
        .route("/api/webhooks", post(handle_webhook))
        // Front-end API
        .route("/api/update-user", post(handlers::handle_save_profile))
        .route(
            "/api/user/:clerk_id",
            get(handlers::handle_get_user).put(handlers::handle_update_profile),
        )
        .route("/api/users", get(handlers::handle_list_users))
        .route("/api/users/:id/paid", patch(handlers::handle_set_paid))
        .route("/api/users/:id", delete(handlers::handle_delete_user))
        .with_state(state)
}

/// CORS restricted to the configured origins. Requests without an `Origin`
/// header (server-to-server webhooks, curl) are unaffected.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid origin in ALLOWED_ORIGINS: '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE]))
}
