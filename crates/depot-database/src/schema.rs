//! Schema bootstrap.

use sqlx::PgPool;
use tracing::info;

use depot_core::error::{AppError, ErrorKind};

/// The canonical DDL for the metadata store.
pub const SCHEMA_SQL: &str = include_str!("../schema.sql");

/// Apply the canonical schema to the given database.
///
/// Every statement is idempotent, so applying to an already initialized
/// database changes nothing.
pub async fn apply_schema(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying metadata schema");
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to apply schema: {e}"),
            e,
        )
    })?;
    info!("Metadata schema applied");
    Ok(())
}
