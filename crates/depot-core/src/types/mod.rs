//! Core type definitions used across the FileDepot workspace.

pub mod filter;
pub mod id;
pub mod pagination;
pub mod sorting;

pub use filter::{FilterField, FilterOp, FilterValue};
pub use id::{ContentId, RecordId};
pub use pagination::{PageRequest, PageResponse};
pub use sorting::SortDirection;
