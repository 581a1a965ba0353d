use std::fmt;

use crate::format::{EncodeError, SelectError};
use crate::handlers::HandlerFault;

/// Everything that can stop a routed request from producing a 200.
///
/// Recovered at the dispatcher boundary: the status comes from
/// [`status`](GatewayError::status) and the body never carries the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Connection, resource or route does not exist
    NotFound,
    /// Explicit format token is not registered
    UnsupportedFormat { token: String },
    /// Nothing satisfies the Accept header and no default is configured
    NotAcceptable { accept: Option<String> },
    /// The handler could not produce a value
    HandlerFault(HandlerFault),
    /// The selected encoder could not render the value
    EncodingFault(EncodeError),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::NotFound | GatewayError::UnsupportedFormat { .. } => 404,
            GatewayError::NotAcceptable { .. } => 406,
            GatewayError::HandlerFault(f) if f.is_client_error() => 400,
            GatewayError::HandlerFault(_) | GatewayError::EncodingFault(_) => 500,
        }
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound => "not_found",
            GatewayError::UnsupportedFormat { .. } => "unsupported_format",
            GatewayError::NotAcceptable { .. } => "not_acceptable",
            GatewayError::HandlerFault(f) if f.is_client_error() => "invalid_parameter",
            GatewayError::HandlerFault(_) => "handler_fault",
            GatewayError::EncodingFault(_) => "encoding_fault",
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NotFound => f.write_str("not found"),
            GatewayError::UnsupportedFormat { token } => {
                write!(f, "format '{token}' is not registered")
            }
            GatewayError::NotAcceptable { accept: Some(a) } => {
                write!(f, "no encoder satisfies Accept '{a}'")
            }
            GatewayError::NotAcceptable { accept: None } => {
                f.write_str("no encoder selected and no default configured")
            }
            GatewayError::HandlerFault(e) => write!(f, "{e}"),
            GatewayError::EncodingFault(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::HandlerFault(e) => Some(e),
            GatewayError::EncodingFault(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HandlerFault> for GatewayError {
    fn from(e: HandlerFault) -> Self {
        GatewayError::HandlerFault(e)
    }
}

impl From<EncodeError> for GatewayError {
    fn from(e: EncodeError) -> Self {
        GatewayError::EncodingFault(e)
    }
}

impl From<SelectError> for GatewayError {
    fn from(e: SelectError) -> Self {
        match e {
            SelectError::UnsupportedFormat { token } => GatewayError::UnsupportedFormat { token },
            SelectError::NotAcceptable { accept } => GatewayError::NotAcceptable { accept },
        }
    }
}
