//! SQL statement builders over [`Entity`] column metadata.
//!
//! Statements use positional placeholders; the entity binds values in
//! the same column order. UPDATE and DELETE address the row through the
//! `id` primary key, bound as `$1`.

use depot_entity::entity::Entity;

/// Build the INSERT statement for an entity type.
pub fn insert_sql<E: Entity>() -> String {
    let columns = E::INSERT_COLUMNS.join(", ");
    let placeholders = (1..=E::INSERT_COLUMNS.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        E::TABLE
    )
}

/// Build the UPDATE statement for an entity type.
pub fn update_sql<E: Entity>() -> String {
    let assignments = E::UPDATE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {} SET {assignments} WHERE id = $1", E::TABLE)
}

/// Build the DELETE statement for an entity type.
pub fn delete_sql<E: Entity>() -> String {
    format!("DELETE FROM {} WHERE id = $1", E::TABLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_entity::file::FileRecord;

    #[test]
    fn test_insert_sql_lists_all_columns() {
        assert_eq!(
            insert_sql::<FileRecord>(),
            "INSERT INTO files (id, created_at, updated_at, is_deleted, file_name, size_in_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
    }

    #[test]
    fn test_update_sql_binds_id_first() {
        assert_eq!(
            update_sql::<FileRecord>(),
            "UPDATE files SET created_at = $2, updated_at = $3, is_deleted = $4, \
             file_name = $5, size_in_bytes = $6 WHERE id = $1"
        );
    }

    #[test]
    fn test_delete_sql_targets_primary_key() {
        assert_eq!(delete_sql::<FileRecord>(), "DELETE FROM files WHERE id = $1");
    }
}
