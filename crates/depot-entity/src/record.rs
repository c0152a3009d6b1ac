//! Shared lifecycle fields for persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use depot_core::types::RecordId;

/// Lifecycle fields shared by all persisted records.
///
/// Entities embed this struct by value (`#[sqlx(flatten)]` /
/// `#[serde(flatten)]`) and opt into logical removal by implementing
/// [`SoftDeletable`](crate::entity::SoftDeletable). The id is assigned at
/// construction and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordMeta {
    /// Primary key.
    pub id: RecordId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
    /// Whether the record has been logically removed.
    pub is_deleted: bool,
}

impl RecordMeta {
    /// Create metadata with a freshly minted id.
    pub fn new() -> Self {
        Self::with_id(RecordId::new())
    }

    /// Create metadata adopting an externally assigned id.
    pub fn with_id(id: RecordId) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Mark the record as logically removed and refresh its
    /// modification timestamp.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.touch();
    }
}

impl Default for RecordMeta {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_live() {
        let meta = RecordMeta::new();
        assert!(!meta.is_deleted);
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn test_with_id_adopts_id() {
        let id = RecordId::new();
        let meta = RecordMeta::with_id(id);
        assert_eq!(meta.id, id);
    }

    #[test]
    fn test_touch_advances_updated_at() {
        let mut meta = RecordMeta::new();
        let before = meta.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        meta.touch();
        assert!(meta.updated_at > before);
        assert_eq!(meta.created_at, before);
    }

    #[test]
    fn test_mark_deleted_sets_flag_and_touches() {
        let mut meta = RecordMeta::new();
        let before = meta.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        meta.mark_deleted();
        assert!(meta.is_deleted);
        assert!(meta.updated_at > before);
    }
}
