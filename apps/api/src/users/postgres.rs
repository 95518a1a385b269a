use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, UserFields, UserRecord};
use crate::users::merge::MergePolicy;
use crate::users::store::{user_not_found, UserStore};

/// Insert-or-lock passes before an upsert gives up. Each extra pass needs a
/// concurrent delete to land between the insert and the lock.
const MAX_UPSERT_ATTEMPTS: usize = 3;

/// PostgreSQL-backed store. Row-level locks serialize writers on one key.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_clerk_id(&self, clerk_id: &str) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE clerk_id = $1")
            .bind(clerk_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, AppError> {
        let users = sqlx::query_as::<_, UserRecord>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn upsert(
        &self,
        candidate: &UserFields,
        merge: MergePolicy,
    ) -> Result<UserRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        for _ in 0..MAX_UPSERT_ATTEMPTS {
            // Locks the row until commit; concurrent upserts/updates/deletes
            // of this clerk_id wait here.
            if let Some(existing) = lock_by_clerk_id(&mut tx, &candidate.clerk_id).await? {
                let merged = merge(Some(&existing), candidate);
                let record = overwrite(&mut tx, existing.id, &merged).await?;
                tx.commit().await?;
                return Ok(record);
            }

            // No row yet. A concurrent insert of the same clerk_id makes this
            // a no-op (after waiting for that transaction), and the next pass
            // locks the winner's row and merges against it.
            let merged = merge(None, candidate);
            if let Some(record) = insert_new(&mut tx, &candidate.clerk_id, &merged).await? {
                tx.commit().await?;
                return Ok(record);
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "upsert of {} kept racing concurrent insert/delete",
            candidate.clerk_id
        )))
    }

    async fn update(&self, update: &ProfileUpdate) -> Result<UserRecord, AppError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, friday = $3, monday = $4,
                shirt = $5, registered = $6
            WHERE clerk_id = $7
            RETURNING *
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.friday)
        .bind(update.monday)
        .bind(&update.shirt)
        .bind(update.registered)
        .bind(&update.clerk_id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| user_not_found(&update.clerk_id))
    }

    async fn patch_paid_status(&self, id: i64, paid: bool) -> Result<UserRecord, AppError> {
        let record =
            sqlx::query_as::<_, UserRecord>("UPDATE users SET paid = $1 WHERE id = $2 RETURNING *")
                .bind(paid)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        record.ok_or_else(|| user_not_found(id))
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }
}

async fn lock_by_clerk_id(
    conn: &mut PgConnection,
    clerk_id: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE clerk_id = $1 FOR UPDATE")
        .bind(clerk_id)
        .fetch_optional(conn)
        .await
}

async fn overwrite(
    conn: &mut PgConnection,
    id: i64,
    fields: &UserFields,
) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        UPDATE users
        SET first_name = $1, last_name = $2, friday = $3, monday = $4,
            shirt = $5, registered = $6, paid = $7
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(fields.friday)
    .bind(fields.monday)
    .bind(&fields.shirt)
    .bind(fields.registered)
    .bind(fields.paid)
    .bind(id)
    .fetch_one(conn)
    .await
}

/// `None` when another transaction already holds this clerk_id.
async fn insert_new(
    conn: &mut PgConnection,
    clerk_id: &str,
    fields: &UserFields,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users
            (clerk_id, first_name, last_name, friday, monday, shirt, registered, paid)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (clerk_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(clerk_id)
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(fields.friday)
    .bind(fields.monday)
    .bind(&fields.shirt)
    .bind(fields.registered)
    .bind(fields.paid)
    .fetch_optional(conn)
    .await
}
