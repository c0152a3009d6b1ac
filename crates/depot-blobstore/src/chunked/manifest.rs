//! Object manifest describing the chunk layout of a stored blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Describes how a stored object is split into chunk files.
///
/// Written as `manifest.json` next to the chunks once every chunk is on
/// disk. Its presence marks the object as complete; a directory without
/// one is never served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobManifest {
    /// Name the payload was uploaded under.
    pub name: String,
    /// Total payload size in bytes.
    pub total_bytes: u64,
    /// Maximum size of a single chunk file.
    pub chunk_size: u64,
    /// Number of chunk files. Zero for an empty payload.
    pub chunk_count: u32,
    /// When the object was written.
    pub created_at: DateTime<Utc>,
}

impl BlobManifest {
    /// File name the manifest is stored under inside an object directory.
    pub const FILE_NAME: &'static str = "manifest.json";

    /// File name of the chunk at the given index.
    pub fn chunk_file(index: u32) -> String {
        format!("chunk_{index:06}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_file_names_are_zero_padded() {
        assert_eq!(BlobManifest::chunk_file(0), "chunk_000000");
        assert_eq!(BlobManifest::chunk_file(42), "chunk_000042");
        assert_eq!(BlobManifest::chunk_file(1_000_000), "chunk_1000000");
    }

    #[test]
    fn test_manifest_round_trips_through_json() {
        let manifest = BlobManifest {
            name: "report.pdf".to_string(),
            total_bytes: 1024,
            chunk_size: 512,
            chunk_count: 2,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&manifest).unwrap();
        let back: BlobManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }
}
