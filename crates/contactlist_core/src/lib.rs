//! Core of the contact list application.
//!
//! Requests (commands and queries) run through a transactional envelope:
//! each call gets its own scope and SQLite connection, passes the validation
//! gate, and is dispatched inside a transaction that commits on success and
//! rolls back on failure.

pub mod config;
pub mod db;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod repo;

pub use config::AppConfig;
pub use db::{Store, TransactionOutcome, TransactionState, TransactionStatsSnapshot};
pub use features::contact::{
    AddContact, AddContactResponse, ContactError, ContactIndex, ContactIndexViewModel,
    DeleteContact, EditContact,
};
pub use features::register_contact_features;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::contact::Contact;
pub use model::entity::{Entity, EntityId, EntityValidationError};
pub use pipeline::dispatch::{handler_fn, DispatchError, Dispatcher, Handler};
pub use pipeline::envelope::{AppContext, AppContextBuilder, BootstrapError, ExecuteError};
pub use pipeline::request::{HandlerError, Request, RequestAccess};
pub use pipeline::scope::ExecutionScope;
pub use pipeline::validation::{
    GateOutcome, ValidationFailure, ValidationResult, Validator, ValidatorRegistry,
    ValidatorRegistryError,
};
pub use pipeline::RegistrationError;
pub use repo::entity_set::EntitySet;
pub use repo::{RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
