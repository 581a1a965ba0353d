use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::encoder::Encoder;
use super::media::{normalize_media_type, AcceptHeader, Specificity};
use super::registry::FormatRegistry;

/// Which input decided the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedBy {
    Token,
    Accept,
    Default,
}

impl SelectedBy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SelectedBy::Token => "token",
            SelectedBy::Accept => "accept",
            SelectedBy::Default => "default",
        }
    }
}

/// Outcome of content negotiation.
#[derive(Debug, Clone)]
pub struct Selection {
    pub encoder: Arc<dyn Encoder>,
    /// Media type to report in `Content-Type`
    pub media_type: Arc<str>,
    pub selected_by: SelectedBy,
}

/// Content negotiation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// Explicit token is not in the registry
    UnsupportedFormat { token: String },
    /// Nothing satisfies the Accept header and no default is configured
    NotAcceptable { accept: Option<String> },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::UnsupportedFormat { token } => {
                write!(f, "format '{token}' is not registered")
            }
            SelectError::NotAcceptable { accept: Some(a) } => {
                write!(f, "no encoder satisfies Accept '{a}'")
            }
            SelectError::NotAcceptable { accept: None } => {
                write!(f, "no default encoder configured")
            }
        }
    }
}

impl std::error::Error for SelectError {}

#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    media_type_index: usize,
    q: f32,
    specificity: Specificity,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        self.q > other.q || (self.q == other.q && self.specificity > other.specificity)
    }
}

/// Resolves a request's format inputs to exactly one encoder.
///
/// Order: explicit token, then Accept header, then the configured default.
#[derive(Debug, Clone)]
pub struct FormatSelector {
    registry: Arc<FormatRegistry>,
    default_media_type: Option<Arc<str>>,
}

impl FormatSelector {
    #[must_use]
    pub fn new(registry: Arc<FormatRegistry>, default_media_type: Option<&str>) -> Self {
        Self {
            registry,
            default_media_type: default_media_type.map(|m| Arc::from(normalize_media_type(m))),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    #[must_use]
    pub fn default_media_type(&self) -> Option<&str> {
        self.default_media_type.as_deref()
    }

    /// Pick the encoder for a request.
    ///
    /// # Errors
    ///
    /// - [`SelectError::UnsupportedFormat`] when `token` is present but unknown
    /// - [`SelectError::NotAcceptable`] when neither the Accept header nor a
    ///   default yields an encoder
    pub fn select(&self, token: Option<&str>, accept: Option<&str>) -> Result<Selection, SelectError> {
        if let Some(token) = token {
            return self.select_token(token);
        }

        let accept = accept.map(str::trim).filter(|a| !a.is_empty());
        let not_acceptable = || SelectError::NotAcceptable {
            accept: accept.map(str::to_string),
        };
        if let Some(header) = accept {
            let parsed = AcceptHeader::parse(header);
            if let Some(selection) = self.select_accept(&parsed) {
                return Ok(selection);
            }
            debug!(accept = %header, "No encoder satisfies Accept header");
            if self.refuses_default(&parsed) {
                debug!(accept = %header, "Accept header refuses the default media type");
                return Err(not_acceptable());
            }
        }

        self.default_selection().ok_or_else(not_acceptable)
    }

    /// The header gives the default media type `q=0`.
    fn refuses_default(&self, accept: &AcceptHeader) -> bool {
        self.default_media_type
            .as_deref()
            .and_then(|default| accept.quality(default))
            .is_some_and(|(q, _)| q <= 0.0)
    }

    fn select_token(&self, token: &str) -> Result<Selection, SelectError> {
        let unsupported = || SelectError::UnsupportedFormat {
            token: token.to_string(),
        };
        let media_type = self.registry.media_type_for(token).ok_or_else(unsupported)?;
        let encoder = self.registry.encoder_for(media_type).ok_or_else(unsupported)?;
        Ok(Selection {
            encoder: Arc::clone(encoder),
            media_type: Arc::from(media_type),
            selected_by: SelectedBy::Token,
        })
    }

    fn select_accept(&self, accept: &AcceptHeader) -> Option<Selection> {
        if accept.is_empty() {
            return None;
        }

        let mut best: Option<Candidate> = None;
        for (index, encoder) in self.registry.encoders().iter().enumerate() {
            for (media_type_index, media_type) in encoder.media_types().iter().enumerate() {
                let Some((q, specificity)) = accept.quality(media_type) else {
                    continue;
                };
                if q <= 0.0 {
                    continue;
                }
                let candidate = Candidate {
                    index,
                    media_type_index,
                    q,
                    specificity,
                };
                if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }
        let best = best?;

        // A bare wildcard says nothing about preference: honour the default.
        if best.specificity == Specificity::Any {
            if let Some(default) = self.default_media_type.as_deref() {
                let default_q = accept.quality(default).map(|(q, _)| q);
                if default_q == Some(best.q) {
                    if let Some(mut selection) = self.default_selection() {
                        selection.selected_by = SelectedBy::Accept;
                        return Some(selection);
                    }
                }
            }
        }

        let encoder = &self.registry.encoders()[best.index];
        let media_type = encoder.media_types()[best.media_type_index];
        Some(Selection {
            encoder: Arc::clone(encoder),
            media_type: Arc::from(media_type),
            selected_by: SelectedBy::Accept,
        })
    }

    fn default_selection(&self) -> Option<Selection> {
        let media_type = self.default_media_type.as_ref()?;
        let encoder = self.registry.encoder_for(media_type)?;
        Some(Selection {
            encoder: Arc::clone(encoder),
            media_type: Arc::clone(media_type),
            selected_by: SelectedBy::Default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(default: Option<&str>) -> FormatSelector {
        FormatSelector::new(Arc::new(FormatRegistry::with_defaults()), default)
    }

    #[test]
    fn test_token_beats_accept() {
        let s = selector(Some("application/json"));
        let sel = s.select(Some("xml"), Some("application/json")).unwrap();
        assert_eq!(sel.encoder.name(), "xml");
        assert_eq!(sel.selected_by, SelectedBy::Token);
    }

    #[test]
    fn test_unknown_token_never_falls_back() {
        let s = selector(Some("application/json"));
        let err = s.select(Some("yaml"), Some("*/*")).unwrap_err();
        assert_eq!(err, SelectError::UnsupportedFormat { token: "yaml".into() });
    }

    #[test]
    fn test_wildcard_prefers_default() {
        let s = selector(Some("text/html"));
        let sel = s.select(None, Some("*/*")).unwrap();
        assert_eq!(&*sel.media_type, "text/html");
    }

    #[test]
    fn test_wildcard_without_default_uses_registration_order() {
        let s = selector(None);
        let sel = s.select(None, Some("*/*")).unwrap();
        assert_eq!(sel.encoder.name(), "json");
    }

    #[test]
    fn test_quality_decides() {
        let s = selector(Some("application/json"));
        let sel = s
            .select(None, Some("application/json;q=0.5, application/xml"))
            .unwrap();
        assert_eq!(sel.encoder.name(), "xml");
    }

    #[test]
    fn test_partial_wildcard() {
        let s = selector(Some("application/json"));
        let sel = s.select(None, Some("text/*")).unwrap();
        // text/plain is registered before text/html
        assert_eq!(&*sel.media_type, "text/plain");
    }

    #[test]
    fn test_q_zero_excludes() {
        let s = selector(None);
        let sel = s.select(None, Some("application/json;q=0, */*")).unwrap();
        assert_ne!(sel.encoder.name(), "json");
    }

    #[test]
    fn test_unmatched_accept_falls_back_to_default() {
        let s = selector(Some("application/json"));
        let sel = s.select(None, Some("application/vnd+unknown")).unwrap();
        assert_eq!(sel.selected_by, SelectedBy::Default);
        assert_eq!(sel.encoder.name(), "json");
    }

    #[test]
    fn test_refused_default_is_not_acceptable() {
        let s = selector(Some("application/json"));
        for accept in ["application/json;q=0", "*/*;q=0", "application/*;q=0, image/png"] {
            let err = s.select(None, Some(accept)).unwrap_err();
            assert!(matches!(err, SelectError::NotAcceptable { accept: Some(_) }), "{accept}");
        }
        // an explicit token still wins
        assert_eq!(
            s.select(Some("js"), Some("application/json;q=0")).unwrap().encoder.name(),
            "json"
        );
    }

    #[test]
    fn test_not_acceptable_without_default() {
        let s = selector(None);
        let err = s.select(None, Some("application/vnd+unknown")).unwrap_err();
        assert!(matches!(err, SelectError::NotAcceptable { accept: Some(_) }));
        assert!(matches!(
            s.select(None, None),
            Err(SelectError::NotAcceptable { accept: None })
        ));
    }

    #[test]
    fn test_no_inputs_uses_default() {
        let s = selector(Some("application/json"));
        let sel = s.select(None, None).unwrap();
        assert_eq!(sel.selected_by, SelectedBy::Default);
    }
}
