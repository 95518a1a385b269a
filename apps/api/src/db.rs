use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `users` table if it does not exist yet.
/// BIGSERIAL never hands out a value twice, so deleted ids are not reused.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id          BIGSERIAL PRIMARY KEY,
            clerk_id    TEXT NOT NULL UNIQUE,
            first_name  TEXT,
            last_name   TEXT,
            friday      BOOLEAN NOT NULL DEFAULT FALSE,
            monday      BOOLEAN NOT NULL DEFAULT FALSE,
            shirt       TEXT NOT NULL DEFAULT '',
            registered  BOOLEAN NOT NULL DEFAULT FALSE,
            paid        BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("users schema ready");
    Ok(())
}
