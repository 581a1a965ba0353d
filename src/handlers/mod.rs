//! Domain handlers.
//!
//! A handler reads path and query parameters from a
//! [`HandlerRequest`](crate::dispatcher::HandlerRequest), talks to a store and
//! returns a [`ResultValue`]. It never chooses an output format.

pub mod list;

use std::fmt;
use std::sync::Arc;

use crate::dispatcher::HandlerRequest;
use crate::store::StoreError;
use crate::value::ResultValue;

/// Why a handler could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerFault {
    /// A path or query parameter is missing or not a number
    InvalidParameter { name: &'static str, value: String },
    /// The store call failed
    Store(StoreError),
    /// The handler panicked; the message is for logs only
    Panicked(String),
    /// The handler coroutine is gone
    Unavailable,
}

impl HandlerFault {
    /// Faults caused by the request rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, HandlerFault::InvalidParameter { .. })
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerFault::InvalidParameter { name, value } => {
                write!(f, "invalid value '{value}' for parameter '{name}'")
            }
            HandlerFault::Store(e) => write!(f, "store error: {e}"),
            HandlerFault::Panicked(message) => write!(f, "handler panicked: {message}"),
            HandlerFault::Unavailable => f.write_str("handler is not responding"),
        }
    }
}

impl std::error::Error for HandlerFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerFault::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for HandlerFault {
    fn from(e: StoreError) -> Self {
        HandlerFault::Store(e)
    }
}

/// Outcome a handler coroutine sends back to the dispatcher.
pub type HandlerResult = Result<ResultValue, HandlerFault>;

/// Shared handler function, invoked on the handler's coroutine.
pub type HandlerFn = Arc<dyn Fn(&HandlerRequest) -> HandlerResult + Send + Sync>;
