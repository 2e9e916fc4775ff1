//! Application context and the transactional envelope.
//!
//! # Responsibility
//! - Hold the registries and transaction counters for one application
//!   instance, constructed explicitly and disposed explicitly.
//! - Execute every request as: open scope, validation gate, begin
//!   transaction, dispatch, commit or roll back, close scope.
//!
//! # Invariants
//! - Validation runs before the transaction; a rejection leaves the store
//!   untouched and opens no transaction.
//! - A handler failure rolls back and is returned unchanged, even when the
//!   rollback itself fails.
//! - The scope is released on every exit path.

use crate::config::AppConfig;
use crate::db::{
    open_db, DbError, DbResult, Store, TransactionOutcome, TransactionStats,
    TransactionStatsSnapshot,
};
use crate::features::register_contact_features;
use crate::logging::{init_logging, LoggingError};
use crate::model::entity::{Entity, EntityId};
use crate::pipeline::dispatch::{DispatchError, Dispatcher, Handler};
use crate::pipeline::request::{HandlerError, Request, RequestAccess};
use crate::pipeline::scope::ExecutionScope;
use crate::pipeline::validation::{
    GateOutcome, ValidationResult, Validator, ValidatorRegistry, ValidatorRegistryError,
};
use crate::pipeline::RegistrationError;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Envelope progress markers, emitted as debug log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopeStage {
    Validating,
    Rejected,
    Opening,
    Dispatching,
    Committed,
    RolledBack,
}

impl EnvelopeStage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::Opening => "opening",
            Self::Dispatching => "dispatching",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

/// Failure returned by `AppContext::execute` and the ad-hoc store calls.
#[derive(Debug)]
pub enum ExecuteError {
    /// The request's validator reported failures; nothing was written.
    Rejected(ValidationResult),
    NoHandlerRegistered { kind: &'static str },
    /// The handler's own failure, moved through untouched.
    Handler(HandlerError),
    /// The store could not open, begin or commit.
    Store(DbError),
}

impl ExecuteError {
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            Self::Rejected(result) => Some(result),
            _ => None,
        }
    }

    /// Downcasts a handler failure to its concrete type.
    pub fn handler_error<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn into_handler_error(self) -> Option<HandlerError> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "validation_rejected",
            Self::NoHandlerRegistered { .. } => "no_handler_registered",
            Self::Handler(_) => "handler_failed",
            Self::Store(_) => "store_failed",
        }
    }
}

impl Display for ExecuteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(result) => write!(f, "{result}"),
            Self::NoHandlerRegistered { kind } => {
                write!(f, "no handler registered for request kind `{kind}`")
            }
            Self::Handler(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExecuteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected(_) => None,
            Self::NoHandlerRegistered { .. } => None,
            Self::Handler(err) => err.source(),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<DbError> for ExecuteError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

impl From<DispatchError> for ExecuteError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::NoHandlerRegistered { kind } => Self::NoHandlerRegistered { kind },
            DispatchError::Handler(err) => Self::Handler(err),
        }
    }
}

/// Failure while building an `AppContext`.
#[derive(Debug)]
pub enum BootstrapError {
    Logging(LoggingError),
    Registration(RegistrationError),
    Db(DbError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "{err}"),
            Self::Registration(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Registration(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<LoggingError> for BootstrapError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<RegistrationError> for BootstrapError {
    fn from(value: RegistrationError) -> Self {
        Self::Registration(value)
    }
}

impl From<DbError> for BootstrapError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Collects validators and handlers before the context is built.
pub struct AppContextBuilder {
    config: AppConfig,
    validators: ValidatorRegistry,
    dispatcher: Dispatcher,
}

impl AppContextBuilder {
    pub fn register_validator<R: Request>(
        &mut self,
        validator: impl Validator<R> + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        self.validators.register::<R>(validator)?;
        Ok(self)
    }

    pub fn register_handler<R, H, F>(&mut self, factory: F) -> Result<&mut Self, RegistrationError>
    where
        R: Request,
        H: Handler<R> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.dispatcher.register::<R, H, F>(factory)?;
        Ok(self)
    }

    /// Initializes logging (when configured), migrates the database and
    /// returns the ready context.
    pub fn build(self) -> Result<AppContext, BootstrapError> {
        if let Some(logging) = self.config.logging.as_ref() {
            init_logging(logging)?;
        }

        // Migrations run once here; scopes then open an up-to-date file.
        let conn = open_db(&self.config.db_path)?;
        drop(conn);

        info!(
            "event=context_bootstrap module=pipeline status=ok validators={} handlers={}",
            self.validators.len(),
            self.dispatcher.len()
        );
        Ok(AppContext {
            config: self.config,
            validators: self.validators,
            dispatcher: self.dispatcher,
            stats: Arc::new(TransactionStats::new()),
            next_scope_id: AtomicU64::new(1),
        })
    }
}

/// Explicitly constructed application instance.
///
/// Build one with `AppContext::bootstrap` (contact features registered) or
/// `AppContext::builder` (empty registries), share it by reference, and call
/// `dispose` when done. `AppContext` is `Sync`: concurrent callers each get
/// their own scope and connection.
pub struct AppContext {
    config: AppConfig,
    validators: ValidatorRegistry,
    dispatcher: Dispatcher,
    stats: Arc<TransactionStats>,
    next_scope_id: AtomicU64,
}

impl AppContext {
    /// Starts a context with empty registries.
    pub fn builder(config: AppConfig) -> AppContextBuilder {
        AppContextBuilder {
            config,
            validators: ValidatorRegistry::new(),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Builds a context with every contact feature registered.
    pub fn bootstrap(config: AppConfig) -> Result<Self, BootstrapError> {
        let mut builder = Self::builder(config);
        register_contact_features(&mut builder)?;
        builder.build()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Counters across every scope opened from this context.
    pub fn transaction_stats(&self) -> TransactionStatsSnapshot {
        self.stats.snapshot()
    }

    /// Opens a new scope with its own store connection.
    pub fn open_scope(&self) -> DbResult<ExecutionScope<'_>> {
        let id = self.next_scope_id.fetch_add(1, Ordering::SeqCst);
        let conn = open_db(&self.config.db_path)?;
        let store = Store::new(conn, Arc::clone(&self.stats));
        Ok(ExecutionScope::new(
            id,
            store,
            &self.validators,
            &self.dispatcher,
        ))
    }

    /// Runs `action` inside a fresh scope and closes it afterwards.
    pub fn scoped<T>(&self, action: impl FnOnce(&mut ExecutionScope<'_>) -> T) -> DbResult<T> {
        let mut scope = self.open_scope()?;
        let value = action(&mut scope);
        scope.close()?;
        Ok(value)
    }

    /// Executes one request through the full envelope.
    ///
    /// Handlers run synchronously on the calling thread with no timeout: a
    /// handler that never returns holds its scope and connection forever.
    ///
    /// # Errors
    /// - `Rejected` when the registered validator fails; no transaction opened.
    /// - `NoHandlerRegistered` when `R` has no handler.
    /// - `Handler` with the handler's own error after rollback.
    /// - `Store` when the connection, begin or commit fails.
    pub fn execute<R: Request>(&self, request: R) -> Result<R::Response, ExecuteError> {
        let started_at = Instant::now();
        let mut scope = self.open_scope()?;
        let scope_id = scope.id();

        let result = run_envelope(&mut scope, request);
        if let Err(err) = scope.close() {
            warn!(
                "event=scope_close module=pipeline status=error scope_id={} error={}",
                scope_id, err
            );
        }

        log_outcome(
            "request_execute",
            R::KIND,
            R::ACCESS,
            scope_id,
            started_at,
            result.as_ref().err(),
        );
        result
    }

    /// Runs a read closure inside a transaction, skipping validation and
    /// dispatch.
    pub fn query<T>(
        &self,
        query: impl FnOnce(&Store) -> Result<T, HandlerError>,
    ) -> Result<T, ExecuteError> {
        self.bracket("adhoc_query", RequestAccess::Query, query)
    }

    /// Runs a write closure inside a transaction, skipping validation and
    /// dispatch. The closure's error rolls the transaction back.
    pub fn transaction<T>(
        &self,
        action: impl FnOnce(&Store) -> Result<T, HandlerError>,
    ) -> Result<T, ExecuteError> {
        self.bracket("adhoc_transaction", RequestAccess::Command, action)
    }

    /// Loads one entity by id.
    pub fn find<E: Entity>(&self, id: EntityId) -> Result<Option<E>, ExecuteError> {
        self.query(|store| Ok(store.set::<E>().find(id)?))
    }

    /// Counts live rows of entity type `E`.
    pub fn count<E: Entity>(&self) -> Result<usize, ExecuteError> {
        self.query(|store| Ok(store.set::<E>().count()?))
    }

    /// Runs the registered validator for `request` without executing it.
    ///
    /// # Errors
    /// - `NoValidatorRegistered` when `R` has no validator.
    pub fn validation<R: Request>(
        &self,
        request: &R,
    ) -> Result<ValidationResult, ValidatorRegistryError> {
        let validator = self.validators.require::<R>()?;
        Ok(validator.validate(request))
    }

    /// Ends the context's lifetime.
    pub fn dispose(self) {
        let stats = self.stats.snapshot();
        info!(
            "event=context_dispose module=pipeline status=ok begun={} committed={} rolled_back={}",
            stats.begun, stats.committed, stats.rolled_back
        );
    }

    fn bracket<T>(
        &self,
        label: &'static str,
        access: RequestAccess,
        work: impl FnOnce(&Store) -> Result<T, HandlerError>,
    ) -> Result<T, ExecuteError> {
        let started_at = Instant::now();
        let mut scope = self.open_scope()?;
        let scope_id = scope.id();

        let result = scope
            .store_mut()
            .begin_transaction()
            .map_err(ExecuteError::from)
            .and_then(|()| {
                let outcome = work(scope.store()).map_err(ExecuteError::Handler);
                close_transaction(scope.store_mut(), label, outcome)
            });
        if let Err(err) = scope.close() {
            warn!(
                "event=scope_close module=pipeline status=error scope_id={} error={}",
                scope_id, err
            );
        }

        log_outcome(
            "store_access",
            label,
            access,
            scope_id,
            started_at,
            result.as_ref().err(),
        );
        result
    }
}

fn run_envelope<R: Request>(
    scope: &mut ExecutionScope<'_>,
    request: R,
) -> Result<R::Response, ExecuteError> {
    trace_stage(R::KIND, scope.id(), EnvelopeStage::Validating);
    let gate = scope.gate(&request);
    debug!(
        "event=validation_gate module=pipeline kind={} scope_id={} outcome={}",
        R::KIND,
        scope.id(),
        gate.as_str()
    );
    if let GateOutcome::Rejected(result) = gate {
        trace_stage(R::KIND, scope.id(), EnvelopeStage::Rejected);
        return Err(ExecuteError::Rejected(result));
    }

    trace_stage(R::KIND, scope.id(), EnvelopeStage::Opening);
    scope.store_mut().begin_transaction()?;

    trace_stage(R::KIND, scope.id(), EnvelopeStage::Dispatching);
    let outcome = scope.dispatch(request).map_err(ExecuteError::from);
    let committed = outcome.is_ok();
    let result = close_transaction(scope.store_mut(), R::KIND, outcome);
    let stage = if committed && result.is_ok() {
        EnvelopeStage::Committed
    } else {
        EnvelopeStage::RolledBack
    };
    trace_stage(R::KIND, scope.id(), stage);
    result
}

/// Commits on success, rolls back on failure. A failed rollback is logged
/// and never replaces the original error.
fn close_transaction<T>(
    store: &mut Store,
    kind: &'static str,
    outcome: Result<T, ExecuteError>,
) -> Result<T, ExecuteError> {
    match outcome {
        Ok(value) => {
            store.close_transaction(TransactionOutcome::Success)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = store.close_transaction(TransactionOutcome::Failure) {
                warn!(
                    "event=tx_rollback module=pipeline status=error kind={} error={}",
                    kind, rollback_err
                );
            }
            Err(err)
        }
    }
}

fn trace_stage(kind: &'static str, scope_id: u64, stage: EnvelopeStage) {
    debug!(
        "event=envelope_stage module=pipeline kind={} scope_id={} stage={}",
        kind,
        scope_id,
        stage.as_str()
    );
}

fn log_outcome(
    event: &'static str,
    kind: &'static str,
    access: RequestAccess,
    scope_id: u64,
    started_at: Instant,
    error: Option<&ExecuteError>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match error {
        None => info!(
            "event={} module=pipeline status=ok kind={} access={} scope_id={} duration_ms={}",
            event,
            kind,
            access.as_str(),
            scope_id,
            duration_ms
        ),
        Some(err) => warn!(
            "event={} module=pipeline status=error kind={} access={} scope_id={} duration_ms={} error_code={}",
            event,
            kind,
            access.as_str(),
            scope_id,
            duration_ms,
            err.code()
        ),
    }
}
