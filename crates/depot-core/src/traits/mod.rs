//! Core traits defined in `depot-core` and implemented by other crates.

pub mod blobstore;

pub use blobstore::{BlobPayload, BlobStore, ByteStream};
