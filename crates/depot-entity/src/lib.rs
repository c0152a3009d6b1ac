//! # depot-entity
//!
//! Domain entity models for FileDepot. Every entity struct represents a
//! database table row, derives `Debug`, `Clone`, `Serialize`,
//! `Deserialize`, and `sqlx::FromRow`, and embeds [`record::RecordMeta`]
//! for the shared lifecycle columns. The [`entity`] module defines the
//! contracts the unit of work persists entities through.

pub mod entity;
pub mod file;
pub mod record;
