//! Request pipeline: validation gate, dispatch and the transactional envelope.
//!
//! # Responsibility
//! - Register validators and handlers per request type at startup.
//! - Execute each request inside its own scope: gate, begin, dispatch,
//!   commit or roll back, release.
//!
//! # Invariants
//! - A request rejected by its validator never opens a transaction.
//! - A handler failure always rolls back and reaches the caller unchanged.
//! - Each request kind maps to at most one validator and one handler.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod dispatch;
pub mod envelope;
pub mod request;
pub mod scope;
pub mod validation;

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    DuplicateValidator { kind: &'static str },
    DuplicateHandler { kind: &'static str },
    /// Two distinct request types declare the same `KIND` tag.
    KindConflict { kind: &'static str },
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateValidator { kind } => {
                write!(f, "validator already registered for request kind `{kind}`")
            }
            Self::DuplicateHandler { kind } => {
                write!(f, "handler already registered for request kind `{kind}`")
            }
            Self::KindConflict { kind } => write!(
                f,
                "request kind `{kind}` is declared by more than one request type"
            ),
        }
    }
}

impl Error for RegistrationError {}

/// Tracks which request type owns each `KIND` tag within one registry.
#[derive(Debug, Default)]
struct KindIndex {
    owners: BTreeMap<&'static str, TypeId>,
}

impl KindIndex {
    fn claim(&mut self, kind: &'static str, type_id: TypeId) -> Result<(), RegistrationError> {
        match self.owners.get(kind) {
            Some(owner) if *owner != type_id => Err(RegistrationError::KindConflict { kind }),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(kind, type_id);
                Ok(())
            }
        }
    }

    fn kinds(&self) -> Vec<&'static str> {
        self.owners.keys().copied().collect()
    }
}
