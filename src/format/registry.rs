use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::encoder::Encoder;
use super::encoders;
use super::media::normalize_media_type;

/// Token → media type mapping (e.g. `csv` → `application/vnd+detectors.csv`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Lowercase short token, as used in `.{format}` suffixes
    pub token: String,
    /// Media type written to `Content-Type`
    pub media_type: String,
}

/// Startup-time registry misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A token maps to a media type no encoder produces
    DanglingToken { token: String, media_type: String },
    /// The configured default media type has no encoder
    UnknownDefault { media_type: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DanglingToken { token, media_type } => write!(
                f,
                "format token '{token}' maps to '{media_type}' but no encoder produces it"
            ),
            RegistryError::UnknownDefault { media_type } => {
                write!(f, "default media type '{media_type}' has no registered encoder")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Ordered set of encoders plus the token table.
///
/// Built once per pipeline instance and frozen behind an `Arc` afterwards;
/// there is no removal operation.
#[derive(Default, Clone)]
pub struct FormatRegistry {
    descriptors: Vec<FormatDescriptor>,
    encoders: Vec<Arc<dyn Encoder>>,
}

impl FormatRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in encoder and the standard token table.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        register_defaults(&mut registry);
        registry
    }

    /// Add or overwrite the mapping for `token`.
    pub fn register(&mut self, token: &str, media_type: &str) {
        let token = token.trim_start_matches('.').to_ascii_lowercase();
        let media_type = normalize_media_type(media_type);
        if let Some(existing) = self.descriptors.iter_mut().find(|d| d.token == token) {
            debug!(
                token = %token,
                previous = %existing.media_type,
                media_type = %media_type,
                "Format token remapped"
            );
            existing.media_type = media_type;
            return;
        }
        self.descriptors.push(FormatDescriptor { token, media_type });
    }

    /// Append an encoder. Earlier encoders win negotiation ties.
    pub fn register_encoder(&mut self, encoder: Arc<dyn Encoder>) {
        debug!(
            encoder = encoder.name(),
            media_types = ?encoder.media_types(),
            position = self.encoders.len(),
            "Encoder registered"
        );
        self.encoders.push(encoder);
    }

    /// Media type mapped to `token`, if any. Tokens are case-insensitive.
    #[must_use]
    pub fn media_type_for(&self, token: &str) -> Option<&str> {
        self.descriptors
            .iter()
            .find(|d| d.token.eq_ignore_ascii_case(token))
            .map(|d| d.media_type.as_str())
    }

    /// First registered encoder producing `media_type` (parameters ignored).
    #[must_use]
    pub fn encoder_for(&self, media_type: &str) -> Option<&Arc<dyn Encoder>> {
        let wanted = normalize_media_type(media_type);
        self.encoders
            .iter()
            .find(|e| e.media_types().iter().any(|m| m.eq_ignore_ascii_case(&wanted)))
    }

    #[must_use]
    pub fn encoders(&self) -> &[Arc<dyn Encoder>] {
        &self.encoders
    }

    #[must_use]
    pub fn descriptors(&self) -> &[FormatDescriptor] {
        &self.descriptors
    }

    /// Distinct media types the registry can produce, in registration order.
    #[must_use]
    pub fn media_types(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let produced = self.encoders.iter().flat_map(|e| e.media_types().iter().copied());
        let mapped = self.descriptors.iter().map(|d| d.media_type.as_str());
        for mt in produced.chain(mapped) {
            if !out.iter().any(|m| m.eq_ignore_ascii_case(mt)) {
                out.push(mt);
            }
        }
        out
    }

    /// Check that every token and the optional default resolve to an encoder.
    pub fn validate(&self, default_media_type: Option<&str>) -> Result<(), RegistryError> {
        for d in &self.descriptors {
            if self.encoder_for(&d.media_type).is_none() {
                return Err(RegistryError::DanglingToken {
                    token: d.token.clone(),
                    media_type: d.media_type.clone(),
                });
            }
        }
        if let Some(default) = default_media_type {
            if self.encoder_for(default).is_none() {
                return Err(RegistryError::UnknownDefault {
                    media_type: default.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("descriptors", &self.descriptors)
            .field(
                "encoders",
                &self.encoders.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Token table shared with existing clients. Must not change.
pub const DEFAULT_FORMAT_TOKENS: &[(&str, &str)] = &[
    ("js", "application/json"),
    ("txt", "text/plain"),
    ("brk", "application/vnd+detectors.brackets"),
    ("brackets", "application/vnd+detectors.brackets"),
    ("csv", "application/vnd+detectors.csv"),
    ("dump", "application/vnd+detectors.dump"),
    ("dmp", "application/vnd+detectors.dump"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("jsv", "application/vnd+detectors.jsv"),
    ("markdown", "application/vnd+detectors.markdown"),
    ("md", "application/vnd+detectors.markdown"),
    ("prtg", "application/vnd+detectors.prtg"),
    ("tbl", "application/vnd+detectors.table"),
    ("table", "application/vnd+detectors.table"),
    ("str", "application/vnd+detectors.string"),
    ("xml", "application/xml"),
];

/// Register the built-in encoders (JSON and plain text first) and the
/// standard token table.
pub fn register_defaults(registry: &mut FormatRegistry) {
    for encoder in encoders::builtin() {
        registry.register_encoder(encoder);
    }
    for (token, media_type) in DEFAULT_FORMAT_TOKENS {
        registry.register(token, media_type);
    }
    info!(
        encoders = registry.encoders().len(),
        tokens = registry.descriptors().len(),
        "Default formats registered"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_overwrites_token() {
        let mut r = FormatRegistry::with_defaults();
        r.register("csv", "text/plain");
        assert_eq!(r.media_type_for("csv"), Some("text/plain"));
        assert_eq!(
            r.descriptors().iter().filter(|d| d.token == "csv").count(),
            1
        );
    }

    #[test]
    fn test_unknown_token_is_not_an_error() {
        let r = FormatRegistry::with_defaults();
        assert_eq!(r.media_type_for("yaml"), None);
        assert_eq!(r.media_type_for("CSV"), Some("application/vnd+detectors.csv"));
    }

    #[test]
    fn test_defaults_validate() {
        let r = FormatRegistry::with_defaults();
        assert!(r.validate(Some("application/json")).is_ok());
        for (token, media_type) in DEFAULT_FORMAT_TOKENS {
            let enc = r.encoder_for(media_type).expect("encoder for default token");
            assert!(enc.media_types().contains(media_type), "{token}");
        }
    }

    #[test]
    fn test_dangling_token_rejected() {
        let mut r = FormatRegistry::new();
        r.register("yaml", "application/yaml");
        assert_eq!(
            r.validate(None),
            Err(RegistryError::DanglingToken {
                token: "yaml".into(),
                media_type: "application/yaml".into()
            })
        );
    }

    #[test]
    fn test_unknown_default_rejected() {
        let r = FormatRegistry::new();
        assert!(matches!(
            r.validate(Some("application/json")),
            Err(RegistryError::UnknownDefault { .. })
        ));
    }

    #[test]
    fn test_shared_media_type_tokens() {
        let r = FormatRegistry::with_defaults();
        assert_eq!(r.media_type_for("htm"), r.media_type_for("html"));
        assert_eq!(r.media_type_for("dmp"), r.media_type_for("dump"));
    }
}
