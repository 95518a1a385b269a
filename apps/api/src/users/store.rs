//! The `UserStore` contract shared by every persistence backend.
//!
//! All operations are atomic with respect to a single `clerk_id` or `id`.
//! Failures of the underlying engine surface as `AppError::StoreUnavailable`
//! and are never retried here.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, UserFields, UserRecord};
use crate::users::merge::MergePolicy;

/// Carried in `AppState` (through the `Reconciler`) as `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_clerk_id(&self, clerk_id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Every record. Backends return them ordered by `id`.
    async fn find_all(&self) -> Result<Vec<UserRecord>, AppError>;

    /// Inserts `candidate` with a fresh id when its `clerk_id` is unknown,
    /// otherwise persists `merge(existing, candidate)` under the existing id.
    /// The read and the write happen under one per-key lock.
    async fn upsert(
        &self,
        candidate: &UserFields,
        merge: MergePolicy,
    ) -> Result<UserRecord, AppError>;

    /// Overwrites the profile fields of an existing record. Never creates.
    async fn update(&self, update: &ProfileUpdate) -> Result<UserRecord, AppError>;

    async fn patch_paid_status(&self, id: i64, paid: bool) -> Result<UserRecord, AppError>;

    /// Deleting an id that does not exist is `NotFound`, not a no-op.
    async fn delete_by_id(&self, id: i64) -> Result<(), AppError>;

    /// Ends the store lifecycle. Operations after `close` fail.
    async fn close(&self);
}

pub(crate) fn user_not_found(key: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("User {key} not found"))
}
