#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Staging store for the rink directory pipeline.
//!
//! Uses `switchy_database` for queries and `switchy_schema` for embedded
//! SQL migrations. Every write autocommits on the single batch
//! connection, so an interrupted run keeps everything written so far.
//!
//! [`init_db`] is idempotent: it applies pending migrations and seeds the
//! source registry, and every pipeline entry point calls it first.

pub mod aliases;
pub mod candidates;
pub mod db;
pub mod fingerprint;
pub mod location_sources;
pub mod locations;
pub mod raw_entries;
pub mod rejections;
pub mod sources;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the workspace `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during staging store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// A required environment variable is not set.
    #[error("{message}")]
    Config {
        /// Operator-facing description of what to set.
        message: String,
    },

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

/// Applies migrations and seeds the source registry. Idempotent; called
/// at the top of every pipeline and curation entry point.
///
/// # Errors
///
/// Returns [`DbError`] if migrations or seeding fail.
pub async fn init_db(db: &dyn Database) -> Result<(), DbError> {
    run_migrations(db).await?;
    sources::seed_sources(db).await?;
    Ok(())
}
