use http::Method;
use may_minihttp::Request;
use std::sync::Arc;
use tracing::debug;

use crate::dispatcher::HeaderVec;
use crate::pipeline::PipelineRequest;

/// Convert a `may_minihttp` request into a [`PipelineRequest`].
///
/// Header names are lowercased; values are decoded lossily. The path keeps
/// its query string for the pipeline to split.
///
/// # Errors
///
/// Returns the method parse error for methods `http` cannot represent.
pub fn parse_request(req: &Request) -> Result<PipelineRequest, http::method::InvalidMethod> {
    let method = Method::from_bytes(req.method().as_bytes())?;
    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase()),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();
    debug!(
        method = %method,
        path = %req.path(),
        header_count = headers.len(),
        "HTTP request parsed"
    );
    Ok(PipelineRequest {
        method,
        path: req.path().to_string(),
        headers,
    })
}
