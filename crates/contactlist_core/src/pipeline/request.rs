//! Request contract shared by commands and queries.

use std::error::Error;

/// Failure raised by a handler or an ad-hoc store closure.
///
/// The envelope moves this value to the caller untouched, so callers can
/// `downcast_ref` to the concrete error type the handler produced.
pub type HandlerError = Box<dyn Error + Send + Sync + 'static>;

/// Whether a request mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAccess {
    Command,
    Query,
}

impl RequestAccess {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Query => "query",
        }
    }
}

/// Plain-data request routed through the pipeline.
///
/// `Response = ()` is the "no result" variant for commands.
pub trait Request: Send + 'static {
    /// Stable snake_case tag used in registries, errors and log events.
    const KIND: &'static str;
    const ACCESS: RequestAccess;

    type Response: Send + 'static;
}
