//! Database migration support.
//!
//! Embeds and runs the SQL migrations in `folio_core/migrations/` that back
//! the Postgres store implementations.

use sqlx::PgPool;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
