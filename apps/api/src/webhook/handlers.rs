use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;
use crate::users::handlers::UserResponse;
use crate::webhook::verifier::WebhookHeaders;

/// POST /api/webhooks
/// Takes the body as raw bytes: the signature covers it exactly as sent.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let webhook_headers = WebhookHeaders::from_header_map(&headers);

    match state.reconciler.handle_event(&body, &webhook_headers).await {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(UserResponse {
                success: true,
                message: "Webhook received and user created or updated",
                user,
            }),
        )),
        Err(e) => {
            warn!(code = e.code(), "Webhook rejected: {e}");
            Err(e)
        }
    }
}
