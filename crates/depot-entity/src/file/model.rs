//! File metadata entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use depot_core::types::{ContentId, RecordId};

use crate::entity::{Entity, SoftDeletable, SqlQuery};
use crate::record::RecordMeta;

/// Metadata for one stored file.
///
/// The primary key is the content id the blob store minted for the
/// file's bytes, so a record and its blob are linked by identity rather
/// than by a mapping table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Shared lifecycle fields.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: RecordMeta,
    /// Display name (including extension), not unique.
    pub file_name: String,
    /// Content size in bytes; 0 when the upload did not declare one.
    pub size_in_bytes: i64,
}

impl FileRecord {
    /// Build the metadata record for a finished blob upload.
    pub fn from_upload(
        content_id: ContentId,
        file_name: impl Into<String>,
        size_in_bytes: i64,
    ) -> Self {
        Self {
            record: RecordMeta::with_id(content_id.into()),
            file_name: file_name.into(),
            size_in_bytes,
        }
    }

    /// The blob store id holding this file's bytes.
    pub fn content_id(&self) -> ContentId {
        ContentId::from(self.record.id)
    }
}

impl Entity for FileRecord {
    const TABLE: &'static str = "files";

    const INSERT_COLUMNS: &'static [&'static str] = &[
        "id",
        "created_at",
        "updated_at",
        "is_deleted",
        "file_name",
        "size_in_bytes",
    ];

    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "created_at",
        "updated_at",
        "is_deleted",
        "file_name",
        "size_in_bytes",
    ];

    fn id(&self) -> &RecordId {
        &self.record.id
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.record.id)
            .bind(self.record.created_at)
            .bind(self.record.updated_at)
            .bind(self.record.is_deleted)
            .bind(&self.file_name)
            .bind(self.size_in_bytes)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.record.id)
            .bind(self.record.created_at)
            .bind(self.record.updated_at)
            .bind(self.record.is_deleted)
            .bind(&self.file_name)
            .bind(self.size_in_bytes)
    }
}

impl SoftDeletable for FileRecord {
    fn record(&self) -> &RecordMeta {
        &self.record
    }

    fn record_mut(&mut self) -> &mut RecordMeta {
        &mut self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_upload_adopts_content_id() {
        let content_id = ContentId::new();
        let file = FileRecord::from_upload(content_id, "report.pdf", 1024);
        assert_eq!(file.record.id, RecordId::from(content_id));
        assert_eq!(file.content_id(), content_id);
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.size_in_bytes, 1024);
        assert!(!file.record.is_deleted);
    }

    #[test]
    fn test_serde_flattens_record_fields() {
        let file = FileRecord::from_upload(ContentId::new(), "a.txt", 3);
        let value = serde_json::to_value(&file).expect("serialize");
        let object = value.as_object().expect("object");
        assert!(object.contains_key("id"));
        assert!(object.contains_key("is_deleted"));
        assert!(object.contains_key("file_name"));
        assert!(!object.contains_key("record"));
    }

    #[test]
    fn test_update_columns_exclude_primary_key() {
        assert!(FileRecord::INSERT_COLUMNS.contains(&"id"));
        assert!(!FileRecord::UPDATE_COLUMNS.contains(&"id"));
    }
}
