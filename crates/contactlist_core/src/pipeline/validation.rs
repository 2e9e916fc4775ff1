//! Validator registry and the pre-transaction validation gate.
//!
//! # Responsibility
//! - Map each request type to zero or one validator.
//! - Run the resolved validator before any transaction is opened.
//!
//! # Invariants
//! - A missing validator means the request is exempt, not an error, on the
//!   dispatch path. Only `require` treats absence as a failure.
//! - The gate has no side effects beyond calling the validator.

use crate::pipeline::request::Request;
use crate::pipeline::{KindIndex, RegistrationError};
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub property: String,
    pub message: String,
}

/// Outcome of checking one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    /// An empty, successful result.
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Messages recorded for one property, in insertion order.
    pub fn messages_for(&self, property: &str) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|failure| failure.property == property)
            .map(|failure| failure.message.as_str())
            .collect()
    }

    pub fn add_failure(&mut self, property: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ValidationFailure {
            property: property.into(),
            message: message.into(),
        });
    }
}

impl Display for ValidationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            return write!(f, "validation succeeded");
        }

        write!(f, "validation failed:")?;
        for failure in &self.failures {
            write!(f, " {}: {};", failure.property, failure.message)?;
        }
        Ok(())
    }
}

impl Error for ValidationResult {}

/// Synchronous rule set for one request type.
pub trait Validator<R>: Send + Sync {
    fn validate(&self, request: &R) -> ValidationResult;
}

type SharedValidator<R> = Arc<dyn Validator<R>>;

/// Strict-probe failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorRegistryError {
    NoValidatorRegistered { kind: &'static str },
}

impl Display for ValidatorRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoValidatorRegistered { kind } => {
                write!(f, "there is no validator for `{kind}` requests")
            }
        }
    }
}

impl Error for ValidatorRegistryError {}

/// Validators keyed by request type.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<TypeId, Box<dyn Any + Send + Sync>>,
    kinds: KindIndex,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the validator for request type `R`.
    pub fn register<R: Request>(
        &mut self,
        validator: impl Validator<R> + 'static,
    ) -> Result<(), RegistrationError> {
        let type_id = TypeId::of::<R>();
        if self.validators.contains_key(&type_id) {
            return Err(RegistrationError::DuplicateValidator { kind: R::KIND });
        }
        self.kinds.claim(R::KIND, type_id)?;

        let shared: SharedValidator<R> = Arc::new(validator);
        self.validators.insert(type_id, Box::new(shared));
        Ok(())
    }

    /// Returns the validator for `R`, or `None` when `R` is exempt.
    pub fn resolve<R: Request>(&self) -> Option<SharedValidator<R>> {
        self.validators
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<SharedValidator<R>>())
            .cloned()
    }

    /// Returns the validator for `R`, failing when none is registered.
    ///
    /// Used by tooling that inspects validation rules directly; dispatch uses
    /// `resolve`.
    pub fn require<R: Request>(&self) -> Result<SharedValidator<R>, ValidatorRegistryError> {
        self.resolve::<R>()
            .ok_or(ValidatorRegistryError::NoValidatorRegistered { kind: R::KIND })
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Sorted kinds with a registered validator.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.kinds.kinds()
    }
}

/// Result of passing one request through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// No validator registered for the request type.
    Exempt,
    Passed,
    Rejected(ValidationResult),
}

impl GateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exempt => "exempt",
            Self::Passed => "passed",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Runs the registered validator for `request`, if any.
pub fn run_gate<R: Request>(registry: &ValidatorRegistry, request: &R) -> GateOutcome {
    let Some(validator) = registry.resolve::<R>() else {
        return GateOutcome::Exempt;
    };

    let result = validator.validate(request);
    if result.is_valid() {
        GateOutcome::Passed
    } else {
        GateOutcome::Rejected(result)
    }
}
