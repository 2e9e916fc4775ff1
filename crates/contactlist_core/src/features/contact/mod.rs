//! Contact commands and queries.
//!
//! # Responsibility
//! - Define the contact request types and their handlers.
//! - Share field rules between add and edit validators.
//!
//! # Invariants
//! - Email addresses are unique, compared case-insensitively.
//! - Stored names, emails and phone numbers are trimmed; a blank phone
//!   number is stored as absent.

mod add_contact;
mod contact_index;
mod delete_contact;
mod edit_contact;
mod rules;

pub use add_contact::{AddContact, AddContactHandler, AddContactResponse, AddContactValidator};
pub use contact_index::{project_index, ContactIndex, ContactIndexHandler, ContactIndexViewModel};
pub use delete_contact::{DeleteContact, DeleteContactHandler};
pub use edit_contact::{EditContact, EditContactHandler, EditContactValidator};

use crate::model::entity::EntityId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Handler-level failures for contact requests.
#[derive(Debug)]
pub enum ContactError {
    /// Another contact already uses this email.
    DuplicateEmail(String),
    NotFound(EntityId),
    Repo(RepoError),
}

impl Display for ContactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEmail(email) => write!(f, "email already in use: `{email}`"),
            Self::NotFound(id) => write!(f, "contact not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContactError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ContactError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

fn normalize_phone(phone_number: Option<String>) -> Option<String> {
    phone_number
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
