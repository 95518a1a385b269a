use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, UserRecord};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: UserRecord,
}

/// Body of the profile endpoints. Only `clerkId` is required; missing or
/// `null` flags read as `false` and a missing shirt as empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub clerk_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub friday: Option<bool>,
    #[serde(default)]
    pub monday: Option<bool>,
    #[serde(default)]
    pub shirt: Option<String>,
    #[serde(default)]
    pub registered: Option<bool>,
}

impl ProfileRequest {
    fn into_update(self, path_clerk_id: Option<&str>) -> Result<ProfileUpdate, AppError> {
        let clerk_id = match (path_clerk_id, self.clerk_id.as_deref()) {
            (Some(path), Some(body)) if path != body => {
                return Err(AppError::Validation(
                    "clerkId in body does not match the URL".to_string(),
                ))
            }
            (Some(path), _) => path.to_string(),
            (None, Some(body)) => body.to_string(),
            (None, None) => String::new(),
        };

        if clerk_id.trim().is_empty() {
            return Err(AppError::Validation("clerkId is required".to_string()));
        }

        Ok(ProfileUpdate {
            clerk_id,
            first_name: self.first_name,
            last_name: self.last_name,
            friday: self.friday.unwrap_or_default(),
            monday: self.monday.unwrap_or_default(),
            shirt: self.shirt.unwrap_or_default(),
            registered: self.registered.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PaidStatusRequest {
    pub paid: bool,
}

/// POST /api/update-user
/// Creates the record for an unknown clerkId, otherwise updates the profile.
pub async fn handle_save_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let update = req.into_update(None)?;
    info!(clerk_id = %update.clerk_id, "Received profile update");

    let user = state.reconciler.save_profile(update).await?;
    Ok(Json(UserResponse {
        success: true,
        message: "User updated successfully",
        user,
    }))
}

/// PUT /api/user/:clerk_id
/// Update-only; 404 when the user has not been created yet.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Path(clerk_id): Path<String>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let update = req.into_update(Some(&clerk_id))?;
    let user = state.reconciler.update_profile(update).await?;
    Ok(Json(UserResponse {
        success: true,
        message: "User updated successfully",
        user,
    }))
}

/// GET /api/user/:clerk_id
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(clerk_id): Path<String>,
) -> Result<Json<UserRecord>, AppError> {
    let user = state
        .reconciler
        .find_user(&clerk_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// GET /api/users
pub async fn handle_list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    Ok(Json(state.reconciler.list_users().await?))
}

/// PATCH /api/users/:id/paid
pub async fn handle_set_paid(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PaidStatusRequest>,
) -> Result<Json<UserRecord>, AppError> {
    let user = state.reconciler.set_paid(id, req.paid).await?;
    Ok(Json(user))
}

/// DELETE /api/users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.reconciler.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
