//! Output formats and content negotiation.
//!
//! A [`FormatRegistry`] owns the encoders and the `.{format}` token table.
//! A [`FormatSelector`] combines an explicit token, the `Accept` header and
//! an optional default into a single [`Selection`].

mod encoder;
pub mod encoders;
pub mod media;
mod registry;
mod selector;

pub use encoder::{EncodeError, Encoder};
pub use media::{normalize_media_type, AcceptHeader, MediaRange};
pub use registry::{
    register_defaults, FormatDescriptor, FormatRegistry, RegistryError, DEFAULT_FORMAT_TOKENS,
};
pub use selector::{FormatSelector, SelectError, SelectedBy, Selection};
