//! Reconciliation engine: the single entry point for every write.
//!
//! Webhook path: verify → normalize → `UserStore::upsert` with
//! `WEBHOOK_MERGE_POLICY`, strictly in that order, stopping at the first
//! failure. Nothing touches the store unless both earlier steps pass.
//!
//! Direct API path: skips verification and goes straight to the store.

use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, UserRecord};
use crate::users::merge::{self, MergePolicy};
use crate::users::store::UserStore;
use crate::webhook::normalizer::normalize;
use crate::webhook::verifier::{WebhookHeaders, WebhookVerifier};

/// Conflict rule for webhook upserts: last writer wins on every field.
// Replaying an old event resets `paid`/`registered`. Whether webhooks should
// preserve operator-set progress is an open product question; changing the
// rule means pointing this at another `merge` function.
pub const WEBHOOK_MERGE_POLICY: MergePolicy = merge::full_overwrite;

/// Conflict rule for the front-end's create-or-update call.
pub const PROFILE_MERGE_POLICY: MergePolicy = merge::keep_paid;

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn UserStore>,
    verifier: WebhookVerifier,
}

impl Reconciler {
    pub fn new(store: Arc<dyn UserStore>, verifier: WebhookVerifier) -> Self {
        Self { store, verifier }
    }

    /// Handles one webhook delivery end to end.
    pub async fn handle_event(
        &self,
        body: &[u8],
        headers: &WebhookHeaders<'_>,
    ) -> Result<UserRecord, AppError> {
        let verified = self.verifier.verify(body, headers)?;
        let candidate = normalize(&verified)?;

        info!(
            event_id = %verified.event_id,
            timestamp = %verified.timestamp,
            event_type = verified.event.event_type.as_deref().unwrap_or("unknown"),
            clerk_id = %candidate.clerk_id,
            "Webhook verified"
        );

        let user = self.store.upsert(&candidate, WEBHOOK_MERGE_POLICY).await?;
        info!(user_id = user.id, "User created or updated from webhook");
        Ok(user)
    }

    /// Create-or-update from the front-end. Creates the record for an unknown
    /// clerk_id; otherwise overwrites the profile fields and keeps `paid`.
    pub async fn save_profile(&self, update: ProfileUpdate) -> Result<UserRecord, AppError> {
        let user = self
            .store
            .upsert(&update.into_fields(), PROFILE_MERGE_POLICY)
            .await?;
        info!(user_id = user.id, clerk_id = %user.clerk_id, "Profile saved");
        Ok(user)
    }

    /// Update-only variant; `NotFound` for an unknown clerk_id.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserRecord, AppError> {
        let user = self.store.update(&update).await?;
        info!(user_id = user.id, clerk_id = %user.clerk_id, "Profile updated");
        Ok(user)
    }

    pub async fn set_paid(&self, id: i64, paid: bool) -> Result<UserRecord, AppError> {
        let user = self.store.patch_paid_status(id, paid).await?;
        info!(user_id = id, paid, "Paid status updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        self.store.delete_by_id(id).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn find_user(&self, clerk_id: &str) -> Result<Option<UserRecord>, AppError> {
        self.store.find_by_clerk_id(clerk_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
        self.store.find_all().await
    }
}
