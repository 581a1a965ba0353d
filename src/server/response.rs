use may_minihttp::Response;
use std::collections::HashMap;

use crate::dispatcher::HandlerResponse;
use crate::format::FormatRegistry;

const FALLBACK_CONTENT_TYPE: &str = "Content-Type: application/octet-stream";

#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Preformatted `Content-Type` header lines.
///
/// `may_minihttp` only takes `'static` header lines, so one line per media
/// type is leaked when the service is created. The set is bounded by the
/// registry's media types.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    lines: HashMap<String, &'static str>,
}

impl ContentTypes {
    #[must_use]
    pub fn for_registry(registry: &FormatRegistry) -> Self {
        let mut lines = HashMap::new();
        let media_types = registry
            .media_types()
            .into_iter()
            .chain(["application/json", "text/plain; version=0.0.4"]);
        for media_type in media_types {
            let key = media_type.to_ascii_lowercase();
            lines.entry(key).or_insert_with(|| {
                let line: &'static str =
                    Box::leak(format!("Content-Type: {media_type}").into_boxed_str());
                line
            });
        }
        Self { lines }
    }

    /// Header line for `media_type`, or `application/octet-stream`.
    #[must_use]
    pub fn header_for(&self, media_type: &str) -> &'static str {
        self.lines
            .get(&media_type.to_ascii_lowercase())
            .copied()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
    }
}

/// Write a pipeline response. Empty-bodied responses carry no content type.
pub fn write_response(res: &mut Response, resp: HandlerResponse, content_types: &ContentTypes) {
    let status = resp.status;
    res.status_code(usize::from(status), status_reason(status));
    if let Some(media_type) = resp.content_type() {
        res.header(content_types.header_for(media_type));
    }
    res.body_vec(resp.body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(406), "Not Acceptable");
    }

    #[test]
    fn test_content_type_lines() {
        let types = ContentTypes::for_registry(&FormatRegistry::with_defaults());
        assert_eq!(
            types.header_for("application/vnd+detectors.csv"),
            "Content-Type: application/vnd+detectors.csv"
        );
        assert_eq!(types.header_for("TEXT/HTML"), "Content-Type: text/html");
        assert_eq!(types.header_for("image/png"), FALLBACK_CONTENT_TYPE);
    }
}
