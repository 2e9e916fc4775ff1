//! Entity contract shared by all persisted records.
//!
//! # Responsibility
//! - Describe how an entity maps onto one SQLite table.
//! - Provide write-time invariant checks.
//!
//! # Invariants
//! - `COLUMNS[0]` is the primary key column and holds `id()` as text.
//! - `to_values()` yields values in `COLUMNS` order.

use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every persisted entity.
pub type EntityId = Uuid;

/// Persisted record with a stable identity.
pub trait Entity: Sized {
    /// Short name used in errors and log events.
    const NAME: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> EntityId;

    /// Column values in `COLUMNS` order.
    fn to_values(&self) -> Vec<Value>;

    /// Decodes one row selected with `COLUMNS`.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Checks invariants that must hold before any write.
    fn validate(&self) -> Result<(), EntityValidationError>;
}

/// Invariant violation detected on an entity before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityValidationError {
    pub entity: &'static str,
    pub field: &'static str,
    pub message: &'static str,
}

impl EntityValidationError {
    pub fn new(entity: &'static str, field: &'static str, message: &'static str) -> Self {
        Self {
            entity,
            field,
            message,
        }
    }
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}.{}: {}", self.entity, self.field, self.message)
    }
}

impl Error for EntityValidationError {}
