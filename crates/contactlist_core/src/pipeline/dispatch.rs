//! Handler registry and request dispatch.
//!
//! # Responsibility
//! - Map each request type to exactly one handler factory.
//! - Build a fresh handler per dispatch and invoke it with the scope's store.
//!
//! # Invariants
//! - Handler invocation is the only place commands mutate the store.
//! - A missing handler is a configuration error and is never retried.

use crate::db::Store;
use crate::pipeline::request::{HandlerError, Request};
use crate::pipeline::{KindIndex, RegistrationError};
use log::error;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Executes one request type against a store.
pub trait Handler<R: Request> {
    fn handle(&mut self, request: R, store: &Store) -> Result<R::Response, HandlerError>;
}

/// Adapts a closure into a `Handler`.
pub struct FnHandler<F>(F);

/// Wraps `f` so it can be registered as a handler.
pub fn handler_fn<R, F>(f: F) -> FnHandler<F>
where
    R: Request,
    F: FnMut(R, &Store) -> Result<R::Response, HandlerError>,
{
    FnHandler(f)
}

impl<R, F> Handler<R> for FnHandler<F>
where
    R: Request,
    F: FnMut(R, &Store) -> Result<R::Response, HandlerError>,
{
    fn handle(&mut self, request: R, store: &Store) -> Result<R::Response, HandlerError> {
        (self.0)(request, store)
    }
}

type HandlerFactory<R> = Arc<dyn Fn() -> Box<dyn Handler<R>> + Send + Sync>;

/// Dispatch failures.
#[derive(Debug)]
pub enum DispatchError {
    NoHandlerRegistered { kind: &'static str },
    /// The handler's own failure, unchanged.
    Handler(HandlerError),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHandlerRegistered { kind } => {
                write!(f, "no handler registered for request kind `{kind}`")
            }
            Self::Handler(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoHandlerRegistered { .. } => None,
            Self::Handler(err) => err.source(),
        }
    }
}

/// Routes requests to their registered handler.
#[derive(Default)]
pub struct Dispatcher {
    factories: BTreeMap<TypeId, Box<dyn Any + Send + Sync>>,
    kinds: KindIndex,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler factory for request type `R`.
    ///
    /// The factory runs once per dispatch, so handler state never leaks
    /// between requests.
    pub fn register<R, H, F>(&mut self, factory: F) -> Result<(), RegistrationError>
    where
        R: Request,
        H: Handler<R> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<R>();
        if self.factories.contains_key(&type_id) {
            return Err(RegistrationError::DuplicateHandler { kind: R::KIND });
        }
        self.kinds.claim(R::KIND, type_id)?;

        let boxed: HandlerFactory<R> = Arc::new(move || Box::new(factory()) as Box<dyn Handler<R>>);
        self.factories.insert(type_id, Box::new(boxed));
        Ok(())
    }

    pub fn handles<R: Request>(&self) -> bool {
        self.factory::<R>().is_some()
    }

    /// Builds a handler for `request` and runs it.
    pub fn dispatch<R: Request>(
        &self,
        request: R,
        store: &Store,
    ) -> Result<R::Response, DispatchError> {
        let Some(factory) = self.factory::<R>() else {
            error!(
                "event=dispatch module=pipeline status=error kind={} error_code=no_handler_registered",
                R::KIND
            );
            return Err(DispatchError::NoHandlerRegistered { kind: R::KIND });
        };

        let mut handler = factory();
        handler
            .handle(request, store)
            .map_err(DispatchError::Handler)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Sorted kinds with a registered handler.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.kinds.kinds()
    }

    fn factory<R: Request>(&self) -> Option<&HandlerFactory<R>> {
        self.factories
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<HandlerFactory<R>>())
    }
}
