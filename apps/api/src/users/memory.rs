use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, UserFields, UserRecord};
use crate::users::merge::MergePolicy;
use crate::users::store::{user_not_found, UserStore};

/// Process-local store for development runs and tests.
///
/// One mutex guards the whole table, which trivially serializes conflicting
/// writers on the same key. Ids come from a counter that only moves forward.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<Table>,
}

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, UserRecord>,
    by_clerk_id: HashMap<String, i64>,
    last_id: i64,
    closed: bool,
}

impl Table {
    fn ensure_open(&self) -> Result<(), AppError> {
        if self.closed {
            return Err(AppError::StoreUnavailable(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn id_for(&self, clerk_id: &str) -> Option<i64> {
        self.by_clerk_id.get(clerk_id).copied()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_clerk_id(&self, clerk_id: &str) -> Result<Option<UserRecord>, AppError> {
        let table = self.inner.lock().await;
        table.ensure_open()?;
        Ok(table
            .id_for(clerk_id)
            .and_then(|id| table.rows.get(&id))
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, AppError> {
        let table = self.inner.lock().await;
        table.ensure_open()?;
        Ok(table.rows.values().cloned().collect())
    }

    async fn upsert(
        &self,
        candidate: &UserFields,
        merge: MergePolicy,
    ) -> Result<UserRecord, AppError> {
        let mut table = self.inner.lock().await;
        table.ensure_open()?;

        let existing_id = table.id_for(&candidate.clerk_id);
        let existing = existing_id.and_then(|id| table.rows.get(&id));
        let mut merged = merge(existing, candidate);
        merged.clerk_id = candidate.clerk_id.clone();

        let id = match existing_id {
            Some(id) => id,
            None => {
                table.last_id += 1;
                let id = table.last_id;
                table.by_clerk_id.insert(candidate.clerk_id.clone(), id);
                id
            }
        };

        let record = UserRecord::from_fields(id, merged);
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, update: &ProfileUpdate) -> Result<UserRecord, AppError> {
        let mut table = self.inner.lock().await;
        table.ensure_open()?;

        let id = table
            .id_for(&update.clerk_id)
            .ok_or_else(|| user_not_found(&update.clerk_id))?;
        let record = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| user_not_found(&update.clerk_id))?;
        update.apply_to(record);
        Ok(record.clone())
    }

    async fn patch_paid_status(&self, id: i64, paid: bool) -> Result<UserRecord, AppError> {
        let mut table = self.inner.lock().await;
        table.ensure_open()?;

        let record = table.rows.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        record.paid = paid;
        Ok(record.clone())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        let mut table = self.inner.lock().await;
        table.ensure_open()?;

        let removed = table.rows.remove(&id).ok_or_else(|| user_not_found(id))?;
        table.by_clerk_id.remove(&removed.clerk_id);
        Ok(())
    }

    async fn close(&self) {
        self.inner.lock().await.closed = true;
    }
}
