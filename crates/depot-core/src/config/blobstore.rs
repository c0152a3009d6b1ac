//! Blob store configuration.

use serde::{Deserialize, Serialize};

/// Chunked blob store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    /// Root directory the store keeps its buckets under.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Bucket name objects are grouped under.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Maximum size of a single chunk file in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,
    /// Sync chunk and manifest files to disk before an upload commits.
    #[serde(default = "default_durable_writes")]
    pub durable_writes: bool,
}

fn default_root_path() -> String {
    "data/blobs".to_string()
}

fn default_bucket() -> String {
    "fs".to_string()
}

fn default_chunk_size() -> u64 {
    // 255 KiB
    255 * 1024
}

fn default_durable_writes() -> bool {
    true
}
