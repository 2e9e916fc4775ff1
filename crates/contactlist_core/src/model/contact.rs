//! Contact domain model.
//!
//! # Invariants
//! - `id` is non-nil and assigned exactly once, at creation.
//! - `name` and `email` are never blank once persisted.

use crate::model::entity::{Entity, EntityId, EntityValidationError};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person in the contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

impl Contact {
    /// Creates a contact with a freshly generated id.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone_number: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone_number,
        }
    }
}

impl Entity for Contact {
    const NAME: &'static str = "contact";
    const TABLE: &'static str = "contacts";
    const COLUMNS: &'static [&'static str] = &["id", "name", "email", "phone_number"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.name.clone()),
            Value::Text(self.email.clone()),
            self.phone_number.clone().map_or(Value::Null, Value::Text),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let id_text: String = row.get("id")?;
        let id = Uuid::parse_str(&id_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{id_text}` in contacts.id"))
        })?;

        let contact = Self {
            id,
            name: row.get("name")?,
            email: row.get("email")?,
            phone_number: row.get("phone_number")?,
        };
        contact.validate()?;
        Ok(contact)
    }

    fn validate(&self) -> Result<(), EntityValidationError> {
        if self.id.is_nil() {
            return Err(EntityValidationError::new(Self::NAME, "id", "must not be nil"));
        }
        if self.name.trim().is_empty() {
            return Err(EntityValidationError::new(Self::NAME, "name", "must not be blank"));
        }
        if self.email.trim().is_empty() {
            return Err(EntityValidationError::new(Self::NAME, "email", "must not be blank"));
        }
        Ok(())
    }
}
