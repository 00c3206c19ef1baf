#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection, queries, and migrations for the travel map.
//!
//! Uses `switchy_database` for query execution and `switchy_schema` for
//! embedded SQL migrations. The embedded migrations create the portable
//! (extension-free) schema; the `PostGIS` geometry column and GIST index are
//! capability-gated DDL applied by [`ensure_spatial_schema`] only when the
//! extension is available.

pub mod db;
pub mod queries;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

/// Checks whether the `PostGIS` extension is installed on the connected
/// database server.
///
/// Probed once at startup to select the spatial predicate engine; never
/// re-checked per call.
///
/// # Errors
///
/// Returns [`DbError`] if the probe query fails.
pub async fn detect_postgis(db: &dyn Database) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT 1 as available FROM pg_available_extensions
             WHERE name = 'postgis' AND installed_version IS NOT NULL",
            &[],
        )
        .await?;

    Ok(!rows.is_empty())
}

/// Applies the spatial enrichment DDL for deployments where `PostGIS` is
/// available: the `geometry` column on `countries` and its GIST index.
///
/// Idempotent; safe to run on every startup. Must only be called after
/// [`detect_postgis`] returned `true`.
///
/// # Errors
///
/// Returns [`DbError`] if any DDL statement fails.
pub async fn ensure_spatial_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw("CREATE EXTENSION IF NOT EXISTS postgis").await?;
    db.exec_raw(
        "ALTER TABLE countries ADD COLUMN IF NOT EXISTS geometry geometry(MultiPolygon, 4326)",
    )
    .await?;
    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_countries_geometry ON countries USING GIST (geometry)",
    )
    .await?;

    log::info!("PostGIS spatial schema is in place");
    Ok(())
}
