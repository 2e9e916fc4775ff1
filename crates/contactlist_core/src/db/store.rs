//! Per-scope store handle with explicit transaction primitives.
//!
//! # Responsibility
//! - Own one SQLite connection for the lifetime of an execution scope.
//! - Expose `begin_transaction` / `close_transaction` as separate calls so the
//!   envelope decides commit vs rollback from the handler outcome.
//! - Hand out typed entity collections via `set::<E>()`.
//!
//! # Invariants
//! - State moves `Idle -> Open -> {Committed | RolledBack}` and never back.
//! - Every successful `begin_transaction` is matched by exactly one counted
//!   commit or rollback in the shared `TransactionStats`.

use super::{DbError, DbResult};
use crate::model::entity::Entity;
use crate::repo::entity_set::EntitySet;
use log::{debug, warn};
use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle of the single transaction a store handle may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Open,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

/// How an open transaction should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Success,
    Failure,
}

/// Transaction counters shared by every scope opened from one context.
#[derive(Debug, Default)]
pub struct TransactionStats {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

/// Point-in-time copy of `TransactionStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStatsSnapshot {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

impl TransactionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TransactionStatsSnapshot {
        TransactionStatsSnapshot {
            begun: self.begun.load(Ordering::SeqCst),
            committed: self.committed.load(Ordering::SeqCst),
            rolled_back: self.rolled_back.load(Ordering::SeqCst),
        }
    }
}

/// Store handle bound to one execution scope.
pub struct Store {
    conn: Connection,
    state: TransactionState,
    stats: Arc<TransactionStats>,
}

impl Store {
    /// Wraps a migrated connection. Counters are shared with sibling scopes.
    pub fn new(conn: Connection, stats: Arc<TransactionStats>) -> Self {
        Self {
            conn,
            state: TransactionState::Idle,
            stats,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Raw connection access for handlers that need queries beyond `set`.
    ///
    /// The transaction belongs to the envelope: callers must not issue
    /// `BEGIN`, `COMMIT`, `ROLLBACK` or `SAVEPOINT` statements on it, or the
    /// recorded state and counters no longer match the database.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns the queryable collection for entity type `E`.
    pub fn set<E: Entity>(&self) -> EntitySet<'_, E> {
        EntitySet::new(&self.conn)
    }

    /// Begins the unit of work for this handle.
    ///
    /// Uses `BEGIN IMMEDIATE` so the write lock is taken up front; a deferred
    /// transaction that reads and then writes could fail with `SQLITE_BUSY`
    /// without waiting on the busy timeout.
    ///
    /// # Errors
    /// - `InvalidTransactionState` when a transaction is open or has finished.
    pub fn begin_transaction(&mut self) -> DbResult<()> {
        if self.state != TransactionState::Idle {
            return Err(DbError::InvalidTransactionState {
                operation: "begin transaction",
                state: self.state,
            });
        }

        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        self.state = TransactionState::Open;
        self.stats.begun.fetch_add(1, Ordering::SeqCst);
        debug!("event=tx_begin module=store status=ok");
        Ok(())
    }

    /// Closes the open transaction by committing or rolling back.
    ///
    /// A failed commit rolls the transaction back before the error is
    /// returned, so the handle always ends in a terminal state.
    ///
    /// # Errors
    /// - `InvalidTransactionState` when no transaction is open.
    /// - `Sqlite` when `COMMIT` or `ROLLBACK` fails.
    pub fn close_transaction(&mut self, outcome: TransactionOutcome) -> DbResult<()> {
        if self.state != TransactionState::Open {
            return Err(DbError::InvalidTransactionState {
                operation: "close transaction",
                state: self.state,
            });
        }

        match outcome {
            TransactionOutcome::Success => match self.conn.execute_batch("COMMIT;") {
                Ok(()) => {
                    self.state = TransactionState::Committed;
                    self.stats.committed.fetch_add(1, Ordering::SeqCst);
                    debug!("event=tx_close module=store status=ok outcome=commit");
                    Ok(())
                }
                Err(err) => {
                    warn!(
                        "event=tx_close module=store status=error outcome=commit error={}",
                        err
                    );
                    if let Err(rollback_err) = self.rollback() {
                        warn!(
                            "event=tx_close module=store status=error outcome=rollback error={}",
                            rollback_err
                        );
                    }
                    Err(err.into())
                }
            },
            TransactionOutcome::Failure => {
                let result = self.rollback();
                debug!(
                    "event=tx_close module=store status={} outcome=rollback",
                    if result.is_ok() { "ok" } else { "error" }
                );
                result
            }
        }
    }

    /// Rolls back a transaction left open by an interrupted scope.
    ///
    /// The connection itself is closed when the handle is dropped.
    pub(crate) fn abandon_open_transaction(&mut self) -> DbResult<()> {
        if self.state != TransactionState::Open {
            return Ok(());
        }

        warn!("event=tx_abandon module=store status=rollback reason=transaction_left_open");
        self.close_transaction(TransactionOutcome::Failure)
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.state = TransactionState::RolledBack;
        self.stats.rolled_back.fetch_add(1, Ordering::SeqCst);
        // SQLite may already have rolled back on its own after some errors.
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }
}
