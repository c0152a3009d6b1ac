//! # depot-service
//!
//! Service layer for FileDepot. [`FileService`] orchestrates the blob
//! store and the transactional metadata store to implement the
//! application-level file operations.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time.

pub mod file;

pub use file::FileService;
