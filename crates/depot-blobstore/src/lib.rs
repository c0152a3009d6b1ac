//! # depot-blobstore
//!
//! Blob store implementations for FileDepot. Ships the chunked local
//! filesystem store used in production and an in-memory store for tests.

pub mod chunked;
pub mod memory;

pub use chunked::ChunkedBlobStore;
pub use memory::MemoryBlobStore;
