//! # Database Migrations
//!
//! Schema for the PostgreSQL store, embedded at compile time from `migrations/`
//! using the `YYYYMMDDHHMMSS_description.sql` naming convention.
//!
//! SQLx takes a PostgreSQL advisory lock while migrating, so concurrent test
//! processes pointing at the same database apply each migration once.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;
use tracing::info;

use super::store::{StoreError, StoreResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

impl From<MigrateError> for StoreError {
    fn from(err: MigrateError) -> Self {
        StoreError::Database(format!("migration failed: {err}"))
    }
}

/// Apply every outstanding migration
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    let known = MIGRATOR.iter().count();
    MIGRATOR.run(pool).await?;
    info!(migrations = known, "Database schema up to date");
    Ok(())
}

/// Versions and descriptions of the embedded migrations, oldest first
pub fn embedded_migrations() -> Vec<(i64, String)> {
    MIGRATOR
        .iter()
        .map(|migration| (migration.version, migration.description.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let migrations = embedded_migrations();
        assert!(!migrations.is_empty());
        assert!(migrations.windows(2).all(|pair| pair[0].0 < pair[1].0));
        assert_eq!(migrations[0].1, "create document workflow");
    }
}
