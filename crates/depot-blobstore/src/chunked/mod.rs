//! Chunked local-filesystem blob store.

pub mod manifest;
pub mod store;

pub use manifest::BlobManifest;
pub use store::ChunkedBlobStore;
