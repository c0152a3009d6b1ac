//! Lazily-evaluated, read-only entity queries.

use std::marker::PhantomData;

use sqlx::PgPool;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::types::{FilterField, FilterOp, FilterValue, PageRequest, SortDirection};
use depot_entity::entity::{Entity, SoftDeletable};

/// A filtered, ordered query over one entity's table.
///
/// Nothing touches the store until a terminal method runs. Results
/// always come back in `id` order (ids are time-ordered, so this is
/// creation order), which keeps pagination windows stable across calls.
/// Reads are untracked: rows reflect committed store state only.
pub struct EntityQuery<E> {
    pool: PgPool,
    filters: Vec<FilterField>,
    direction: SortDirection,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityQuery<E> {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self {
            pool,
            filters: Vec::new(),
            direction: SortDirection::Asc,
            _entity: PhantomData,
        }
    }

    /// Add a filter condition. Conditions combine with AND.
    pub fn filter(mut self, filter: FilterField) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the direction of the `id` ordering.
    pub fn order(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Count all rows matching the filters, ignoring pagination.
    pub async fn count(&self) -> AppResult<u64> {
        let (clause, _) = build_where(&self.filters)?;
        let statement = format!("SELECT COUNT(*) FROM {}{}", E::TABLE, clause);

        let mut query = sqlx::query_scalar::<_, i64>(&statement);
        for value in bind_values(&self.filters) {
            query = match value {
                FilterValue::String(s) => query.bind(s.clone()),
                FilterValue::Integer(i) => query.bind(*i),
                FilterValue::Boolean(b) => query.bind(*b),
                FilterValue::Null => query,
            };
        }

        let total = query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to count rows in {}", E::TABLE),
                e,
            )
        })?;
        Ok(total as u64)
    }

    /// Fetch one page of matching rows.
    pub async fn fetch_page(&self, page: &PageRequest) -> AppResult<Vec<E>> {
        let (clause, bound) = build_where(&self.filters)?;
        let statement = format!(
            "SELECT * FROM {}{} ORDER BY id {} LIMIT ${} OFFSET ${}",
            E::TABLE,
            clause,
            self.direction.as_sql(),
            bound + 1,
            bound + 2,
        );

        let mut query = sqlx::query_as::<_, E>(&statement);
        for value in bind_values(&self.filters) {
            query = match value {
                FilterValue::String(s) => query.bind(s.clone()),
                FilterValue::Integer(i) => query.bind(*i),
                FilterValue::Boolean(b) => query.bind(*b),
                FilterValue::Null => query,
            };
        }

        query
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to list rows from {}", E::TABLE),
                    e,
                )
            })
    }

    /// Fetch every matching row.
    pub async fn fetch_all(&self) -> AppResult<Vec<E>> {
        let (clause, _) = build_where(&self.filters)?;
        let statement = format!(
            "SELECT * FROM {}{} ORDER BY id {}",
            E::TABLE,
            clause,
            self.direction.as_sql(),
        );

        let mut query = sqlx::query_as::<_, E>(&statement);
        for value in bind_values(&self.filters) {
            query = match value {
                FilterValue::String(s) => query.bind(s.clone()),
                FilterValue::Integer(i) => query.bind(*i),
                FilterValue::Boolean(b) => query.bind(*b),
                FilterValue::Null => query,
            };
        }

        query.fetch_all(&self.pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to list rows from {}", E::TABLE),
                e,
            )
        })
    }
}

impl<E: SoftDeletable> EntityQuery<E> {
    /// Keep only rows that have not been logically removed.
    pub fn exclude_deleted(self) -> Self {
        self.filter(FilterField::eq_bool("is_deleted", false))
    }
}

/// Render the WHERE clause and report how many placeholders it bound.
///
/// Field names are interpolated into the statement, so they are
/// validated as plain identifiers first.
fn build_where(filters: &[FilterField]) -> AppResult<(String, usize)> {
    if filters.is_empty() {
        return Ok((String::new(), 0));
    }

    let mut parts = Vec::with_capacity(filters.len());
    let mut bound = 0usize;
    for filter in filters {
        validate_identifier(&filter.field)?;
        let part = match (filter.op, &filter.value) {
            (FilterOp::IsNull, _) => format!("{} IS NULL", filter.field),
            (FilterOp::IsNotNull, _) => format!("{} IS NOT NULL", filter.field),
            (_, FilterValue::Null) => {
                return Err(AppError::invalid_argument(format!(
                    "Filter on {} requires a value",
                    filter.field
                )));
            }
            (FilterOp::Eq, _) => {
                bound += 1;
                format!("{} = ${bound}", filter.field)
            }
            (FilterOp::Ne, _) => {
                bound += 1;
                format!("{} <> ${bound}", filter.field)
            }
            (FilterOp::Like, _) => {
                bound += 1;
                format!("{} LIKE ${bound} ESCAPE '\\'", filter.field)
            }
        };
        parts.push(part);
    }

    Ok((format!(" WHERE {}", parts.join(" AND ")), bound))
}

fn bind_values(filters: &[FilterField]) -> impl Iterator<Item = &FilterValue> {
    filters
        .iter()
        .filter(|f| !matches!(f.op, FilterOp::IsNull | FilterOp::IsNotNull))
        .map(|f| &f.value)
}

fn validate_identifier(field: &str) -> AppResult<()> {
    let mut chars = field.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::invalid_argument(format!(
            "Invalid filter field name: {field:?}"
        )))
    }
}
