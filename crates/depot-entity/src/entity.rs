//! Persistence contracts entities implement to ride the unit of work.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres};

use depot_core::types::RecordId;

use crate::record::RecordMeta;

/// A bound SQL statement under construction.
pub type SqlQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Contract a struct implements to be persisted through the unit of work.
///
/// The unit of work builds its INSERT/UPDATE/DELETE statements from the
/// column metadata and delegates value binding back to the entity, which
/// keeps the unit of work fully type-agnostic. Every entity table has a
/// `TEXT` primary key column named `id`.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    /// Table the entity is stored in.
    const TABLE: &'static str;

    /// Columns written on INSERT, in bind order.
    const INSERT_COLUMNS: &'static [&'static str];

    /// Columns written on UPDATE, in bind order. The primary key is
    /// never listed here; it is bound first as the WHERE argument.
    const UPDATE_COLUMNS: &'static [&'static str];

    /// Primary key of this instance.
    fn id(&self) -> &RecordId;

    /// Bind INSERT values in `INSERT_COLUMNS` order.
    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q>;

    /// Bind UPDATE values: the primary key first, then `UPDATE_COLUMNS`
    /// in order.
    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q>;
}

/// Capability trait for entities that support logical removal.
///
/// Removing a `SoftDeletable` entity through the unit of work flips
/// [`RecordMeta::is_deleted`] and stages an UPDATE; the row is never
/// physically deleted. Entities without this capability can only be
/// removed with a physical DELETE.
pub trait SoftDeletable: Entity {
    /// Shared lifecycle fields.
    fn record(&self) -> &RecordMeta;

    /// Mutable access to the shared lifecycle fields.
    fn record_mut(&mut self) -> &mut RecordMeta;
}
