//! Per-request execution scope.
//!
//! # Responsibility
//! - Own a fresh store handle (its own SQLite connection) for one request.
//! - Expose the context's validators and dispatcher to that request.
//! - Release everything on every exit path.
//!
//! # Invariants
//! - A scope serves exactly one request and is released exactly once:
//!   `close` consumes it, and `Drop` releases a scope that was never closed.
//! - `dispatch` takes `&mut self` and the store is not `Sync`, so two requests
//!   can never run through one scope at the same time.
//!
//! Closing twice does not compile:
//!
//! ```compile_fail
//! # use contactlist_core::AppContext;
//! # fn demo(context: &AppContext) -> Result<(), contactlist_core::db::DbError> {
//! let scope = context.open_scope()?;
//! scope.close()?;
//! scope.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Neither does dispatching from two threads through one scope:
//!
//! ```compile_fail
//! # use contactlist_core::{AppContext, ContactIndex};
//! # fn demo(context: &AppContext) -> Result<(), contactlist_core::db::DbError> {
//! let mut scope = context.open_scope()?;
//! std::thread::scope(|threads| {
//!     threads.spawn(|| scope.dispatch(ContactIndex));
//!     threads.spawn(|| scope.dispatch(ContactIndex));
//! });
//! # Ok(())
//! # }
//! ```

use crate::db::{DbResult, Store};
use crate::pipeline::dispatch::{DispatchError, Dispatcher};
use crate::pipeline::request::Request;
use crate::pipeline::validation::{run_gate, GateOutcome, ValidatorRegistry};
use log::{debug, warn};

/// Isolated resources for one in-flight request.
pub struct ExecutionScope<'ctx> {
    id: u64,
    store: Store,
    validators: &'ctx ValidatorRegistry,
    dispatcher: &'ctx Dispatcher,
    released: bool,
}

impl<'ctx> ExecutionScope<'ctx> {
    pub(crate) fn new(
        id: u64,
        store: Store,
        validators: &'ctx ValidatorRegistry,
        dispatcher: &'ctx Dispatcher,
    ) -> Self {
        debug!("event=scope_open module=pipeline status=ok scope_id={id}");
        Self {
            id,
            store,
            validators,
            dispatcher,
            released: false,
        }
    }

    /// Sequence number of this scope within its context, for log correlation.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn validators(&self) -> &'ctx ValidatorRegistry {
        self.validators
    }

    /// Runs the validation gate for `request`.
    pub fn gate<R: Request>(&self, request: &R) -> GateOutcome {
        run_gate(self.validators, request)
    }

    /// Dispatches `request` to its handler with this scope's store.
    ///
    /// Does not open or close a transaction; the envelope does that.
    pub fn dispatch<R: Request>(&mut self, request: R) -> Result<R::Response, DispatchError> {
        self.dispatcher.dispatch(request, &self.store)
    }

    /// Releases the scope, rolling back any transaction still open.
    pub fn close(mut self) -> DbResult<()> {
        self.release()
    }

    fn release(&mut self) -> DbResult<()> {
        self.released = true;
        let result = self.store.abandon_open_transaction();
        debug!(
            "event=scope_close module=pipeline status={} scope_id={} tx_state={}",
            if result.is_ok() { "ok" } else { "error" },
            self.id,
            self.store.state().as_str()
        );
        result
    }
}

impl Drop for ExecutionScope<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.release() {
            warn!(
                "event=scope_close module=pipeline status=error scope_id={} reason=dropped error={}",
                self.id, err
            );
        }
    }
}
