//! Transactional unit of work over the metadata store.

use std::fmt;
use std::mem;

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::types::RecordId;
use depot_entity::entity::{Entity, SoftDeletable};

use crate::query::EntityQuery;
use crate::sql;

/// A transactional unit of work, scoped to one logical operation.
///
/// Changes staged through [`add`](Self::add), [`update`](Self::update),
/// [`remove`](Self::remove), and [`remove_hard`](Self::remove_hard)
/// touch no store until [`commit`](Self::commit) flushes them, in
/// staging order, inside a single transaction. Staged entity types may
/// be mixed freely within one instance.
///
/// Dropping the unit of work while a transaction is open rolls the
/// transaction back; a completed commit or rollback returns the instance
/// to its idle state for reuse.
pub struct UnitOfWork {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    staged: Vec<Box<dyn StagedOp>>,
}

impl UnitOfWork {
    /// Create a unit of work over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            staged: Vec::new(),
        }
    }

    /// Open a transaction if none is open; a no-op otherwise.
    ///
    /// [`commit`](Self::commit) opens a transaction internally when
    /// needed, so calling this first is only required by callers that
    /// want the transaction to span reads as well.
    pub async fn begin_transaction(&mut self) -> AppResult<()> {
        if self.tx.is_none() {
            let tx = self.pool.begin().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to open transaction", e)
            })?;
            self.tx = Some(tx);
            debug!("Transaction opened");
        }
        Ok(())
    }

    /// Stage an entity for insertion.
    pub fn add<E: Entity>(&mut self, entity: E) {
        debug!(table = E::TABLE, id = %entity.id(), "Staging insert");
        self.staged.push(Box::new(StagedInsert(entity)));
    }

    /// Stage an entity for modification.
    pub fn update<E: Entity>(&mut self, entity: E) {
        debug!(table = E::TABLE, id = %entity.id(), "Staging update");
        self.staged.push(Box::new(StagedUpdate(entity)));
    }

    /// Stage the removal of a soft-deletable entity.
    ///
    /// The entity is marked deleted and staged as an update; the row is
    /// never physically deleted. Use [`remove_hard`](Self::remove_hard)
    /// for entities without the capability.
    pub fn remove<E: SoftDeletable>(&mut self, mut entity: E) {
        entity.record_mut().mark_deleted();
        debug!(table = E::TABLE, id = %entity.id(), "Staging soft delete");
        self.staged.push(Box::new(StagedUpdate(entity)));
    }

    /// Stage a physical DELETE of an entity's row.
    pub fn remove_hard<E: Entity>(&mut self, entity: E) {
        debug!(table = E::TABLE, id = %entity.id(), "Staging delete");
        self.staged.push(Box::new(StagedDelete(entity)));
    }

    /// Flush staged changes and commit.
    ///
    /// Runs every staged statement in staging order inside the open
    /// transaction, opening one when none is open. Any failure rolls the
    /// transaction back before the error is returned, so no partial
    /// commit is ever observable. Returns whether at least one row was
    /// affected. The unit of work is idle again afterwards, on success
    /// and on failure alike.
    pub async fn commit(&mut self) -> AppResult<bool> {
        let staged = mem::take(&mut self.staged);
        if staged.is_empty() && self.tx.is_none() {
            return Ok(false);
        }

        let mut tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await.map_err(|e| {
                AppError::with_source(ErrorKind::MetadataCommit, "Failed to open transaction", e)
            })?,
        };

        let mut affected: u64 = 0;
        for op in staged {
            match op.run(&mut *tx).await {
                Ok(rows) => affected += rows,
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Rollback after failed flush also failed");
                    }
                    return Err(err);
                }
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::MetadataCommit, "Failed to commit transaction", e)
        })?;

        debug!(rows = affected, "Committed staged changes");
        Ok(affected > 0)
    }

    /// Discard all staged changes and revert the open transaction, if any.
    ///
    /// Subsequent reads reflect store state, not previously staged state.
    pub async fn rollback(&mut self) -> AppResult<()> {
        let discarded = self.staged.len();
        self.staged.clear();
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
            })?;
        }
        if discarded > 0 {
            debug!(discarded, "Discarded staged changes");
        }
        Ok(())
    }

    /// Load a single row by primary key.
    ///
    /// Reads the committed store state: staged changes and the open
    /// transaction are not consulted. Soft-deleted rows are returned
    /// like any other row.
    pub async fn find_by_id<E: Entity>(&self, id: &RecordId) -> AppResult<Option<E>> {
        let statement = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        sqlx::query_as::<_, E>(&statement)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to load row from {}", E::TABLE),
                    e,
                )
            })
    }

    /// Start a read-only, untracked query over an entity's table.
    pub fn query<E: Entity>(&self) -> EntityQuery<E> {
        EntityQuery::new(self.pool.clone())
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("transaction_open", &self.tx.is_some())
            .field("staged", &self.staged.len())
            .finish()
    }
}

/// One staged statement, run against the commit transaction.
trait StagedOp: Send {
    fn run<'c>(self: Box<Self>, conn: &'c mut PgConnection) -> BoxFuture<'c, AppResult<u64>>;
}

struct StagedInsert<E>(E);

impl<E: Entity> StagedOp for StagedInsert<E> {
    fn run<'c>(self: Box<Self>, conn: &'c mut PgConnection) -> BoxFuture<'c, AppResult<u64>> {
        Box::pin(async move {
            let statement = sql::insert_sql::<E>();
            let result = self
                .0
                .bind_insert(sqlx::query(&statement))
                .execute(conn)
                .await
                .map_err(|e| flush_error(E::TABLE, "insert into", e))?;
            Ok(result.rows_affected())
        })
    }
}

struct StagedUpdate<E>(E);

impl<E: Entity> StagedOp for StagedUpdate<E> {
    fn run<'c>(self: Box<Self>, conn: &'c mut PgConnection) -> BoxFuture<'c, AppResult<u64>> {
        Box::pin(async move {
            let statement = sql::update_sql::<E>();
            let result = self
                .0
                .bind_update(sqlx::query(&statement))
                .execute(conn)
                .await
                .map_err(|e| flush_error(E::TABLE, "update", e))?;
            Ok(result.rows_affected())
        })
    }
}

struct StagedDelete<E>(E);

impl<E: Entity> StagedOp for StagedDelete<E> {
    fn run<'c>(self: Box<Self>, conn: &'c mut PgConnection) -> BoxFuture<'c, AppResult<u64>> {
        Box::pin(async move {
            let statement = sql::delete_sql::<E>();
            let result = sqlx::query(&statement)
                .bind(*self.0.id())
                .execute(conn)
                .await
                .map_err(|e| flush_error(E::TABLE, "delete from", e))?;
            Ok(result.rows_affected())
        })
    }
}

fn flush_error(table: &str, verb: &str, err: sqlx::Error) -> AppError {
    AppError::with_source(
        ErrorKind::MetadataCommit,
        format!("Failed to {verb} {table}"),
        err,
    )
}
