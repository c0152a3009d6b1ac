//! # depot-database
//!
//! PostgreSQL connection management, the transactional unit of work, and
//! the generic entity query builder for FileDepot.
//!
//! The canonical schema ships as `schema.sql` next to this crate; it is
//! applied wholesale, there is no incremental migration tooling.

pub mod connection;
pub mod query;
pub mod schema;
pub mod sql;
pub mod uow;

pub use connection::DatabasePool;
pub use query::EntityQuery;
pub use uow::UnitOfWork;
