use std::fmt;

use crate::value::{ResultValue, Shape};

/// Error raised when an encoder cannot render a value.
///
/// Both variants point at a registration or handler bug rather than bad client
/// input: the dispatcher logs them at error level and answers 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoder does not declare the value's shape
    UnsupportedShape {
        /// Encoder name
        encoder: &'static str,
        /// Shape it was handed
        shape: Shape,
    },
    /// The value has the right shape but cannot be represented in the format
    Unrepresentable {
        /// Encoder name
        encoder: &'static str,
        /// What could not be written
        message: String,
    },
}

impl EncodeError {
    #[must_use]
    pub fn unsupported(encoder: &'static str, shape: Shape) -> Self {
        EncodeError::UnsupportedShape { encoder, shape }
    }

    #[must_use]
    pub fn unrepresentable(encoder: &'static str, message: impl Into<String>) -> Self {
        EncodeError::Unrepresentable {
            encoder,
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnsupportedShape { encoder, shape } => {
                write!(f, "encoder '{encoder}' cannot render a {shape} value")
            }
            EncodeError::Unrepresentable { encoder, message } => {
                write!(f, "encoder '{encoder}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// An output encoding for [`ResultValue`]s.
///
/// Implementations are pure: the bytes depend only on the value and the
/// encoder's own static configuration. Registration order inside a
/// [`FormatRegistry`](super::FormatRegistry) is the tie-break during content
/// negotiation.
pub trait Encoder: Send + Sync {
    /// Short name used in logs and errors (e.g. `"csv"`)
    fn name(&self) -> &'static str;

    /// Media types this encoder produces. The first one is its canonical type.
    fn media_types(&self) -> &[&'static str];

    /// Shapes this encoder can render. Defaults to every renderable shape.
    fn shapes(&self) -> &[Shape] {
        &Shape::RENDERABLE
    }

    fn accepts(&self, shape: Shape) -> bool {
        shape != Shape::Absent && self.shapes().contains(&shape)
    }

    /// Append the rendering of `value` to `out`.
    ///
    /// Only called for shapes that [`accepts`](Encoder::accepts) allows.
    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError>;

    /// Render `value` into a fresh buffer, enforcing the declared shapes.
    fn encode(&self, value: &ResultValue) -> Result<Vec<u8>, EncodeError> {
        let shape = value.shape();
        if !self.accepts(shape) {
            return Err(EncodeError::unsupported(self.name(), shape));
        }
        let mut out = Vec::with_capacity(64);
        self.render(value, &mut out)?;
        Ok(out)
    }
}

impl fmt::Debug for dyn Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("name", &self.name())
            .field("media_types", &self.media_types())
            .finish()
    }
}
