//! PostgreSQL migration management
//!
//! Handles schema initialization and versioned migrations. The continuous
//! aggregates and policies are applied statement by statement because
//! TimescaleDB refuses to create them inside a transaction block.

use sqlx::PgPool;

use super::error::PostgresError;
use super::schema::{
    CREATE_HYPERTABLE, SCHEMA, SCHEMA_VERSION, continuous_aggregates, refresh_policies,
    retention_policy,
};

/// Run all pending migrations
pub async fn run_migrations(pool: &PgPool, retention_days: u32) -> Result<(), PostgresError> {
    // Check if schema_version table exists
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = 'schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!("Applying initial schema v{}", SCHEMA_VERSION);
        apply_initial_schema(pool, retention_days).await?;
        return Ok(());
    }

    let current_version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await?;

    match current_version {
        None => {
            // Table exists but no version row - apply schema
            tracing::debug!("Applying initial schema v{}", SCHEMA_VERSION);
            apply_initial_schema(pool, retention_days).await?;
        }
        Some(v) if v < SCHEMA_VERSION => {
            tracing::debug!("Migrating schema from v{} to v{}", v, SCHEMA_VERSION);
            for version in (v + 1)..=SCHEMA_VERSION {
                apply_versioned_migration(pool, version).await?;
            }
        }
        Some(v) if v > SCHEMA_VERSION => {
            tracing::warn!(
                "Schema version {} is newer than application version {}. This may cause issues.",
                v,
                SCHEMA_VERSION
            );
        }
        _ => {
            tracing::debug!("Schema is up to date (v{})", SCHEMA_VERSION);
        }
    }

    Ok(())
}

/// Apply the initial schema: tables, hypertable conversion, continuous
/// aggregates, refresh and retention policies.
async fn apply_initial_schema(pool: &PgPool, retention_days: u32) -> Result<(), PostgresError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    sqlx::raw_sql(CREATE_HYPERTABLE).execute(pool).await?;

    // One statement at a time: cagg creation cannot run in a transaction,
    // and a multi-statement batch executes as one implicit transaction.
    for ddl in continuous_aggregates() {
        sqlx::raw_sql(&ddl).execute(pool).await?;
    }
    for policy in refresh_policies() {
        sqlx::raw_sql(&policy).execute(pool).await?;
    }
    sqlx::raw_sql(&retention_policy(retention_days))
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at, description)
         VALUES (1, $1, $2, 'Initial schema')
         ON CONFLICT (id) DO UPDATE SET version = $1, applied_at = $2",
    )
    .bind(SCHEMA_VERSION)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::debug!(
        retention_days,
        "Schema v{} applied successfully",
        SCHEMA_VERSION
    );
    Ok(())
}

/// Apply a specific versioned migration
///
/// Add new migrations here as the schema evolves. Currently no versioned
/// migrations exist - schema v1 is applied via the SCHEMA constant.
#[allow(unused_variables)]
async fn apply_versioned_migration(pool: &PgPool, version: i32) -> Result<(), PostgresError> {
    let now = chrono::Utc::now().timestamp();

    // Add future migrations here as match arms:
    let sql: &str = match version {
        // Example:
        // 2 => "ALTER TABLE spans ADD COLUMN ...",
        _ => {
            return Err(PostgresError::MigrationFailed {
                version,
                error: format!("No migration defined for version {}", version),
            });
        }
    };

    #[allow(unreachable_code)]
    {
        sqlx::raw_sql(sql)
            .execute(pool)
            .await
            .map_err(|e| PostgresError::MigrationFailed {
                version,
                error: e.to_string(),
            })?;

        sqlx::query("UPDATE schema_version SET version = $1, applied_at = $2 WHERE id = 1")
            .bind(version)
            .bind(now)
            .execute(pool)
            .await?;

        tracing::debug!("Migration v{} applied", version);
        Ok(())
    }
}
