//! Dispatcher core: handler dispatch, middleware, negotiation, encoding.

use http::Method;
use may::sync::mpsc;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::GatewayError;
use crate::format::FormatSelector;
use crate::handlers::{HandlerFault, HandlerFn, HandlerResult};
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use crate::worker_pool::{WorkerPool, WorkerPoolConfig};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage for the hot path. Names are lowercase.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Body sent with 400 responses.
pub const BAD_REQUEST_BODY: &str = r#"{"error":"Bad Request"}"#;
/// Body sent with 500 responses. Never includes the underlying error.
pub const INTERNAL_ERROR_BODY: &str = r#"{"error":"Internal Server Error"}"#;

/// Request data passed to a handler worker
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path as received, without the query string
    pub path: String,
    pub handler_name: Arc<str>,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    /// Explicit format token from the route suffix
    pub format: Option<String>,
    /// Channel for sending the outcome back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResult>,
}

impl HandlerRequest {
    /// Last occurrence wins for repeated names.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Last occurrence wins (`?start=1&start=2` → `2`).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Explicit format token: the route suffix, else the `format` query parameter.
    #[must_use]
    pub fn format_token(&self) -> Option<&str> {
        self.format
            .as_deref()
            .or_else(|| self.get_query_param("format"))
            .filter(|t| !t.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn for_test(
        handler_name: &str,
        path: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Self {
        Self::for_test_with_reply(handler_name, path, query).0
    }

    #[cfg(test)]
    pub(crate) fn for_test_with_reply(
        handler_name: &str,
        path: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> (Self, mpsc::Receiver<HandlerResult>) {
        let (reply_tx, reply_rx) = mpsc::channel();
        let req = Self {
            request_id: RequestId::new(),
            method: Method::GET,
            path: String::from("/test"),
            handler_name: Arc::from(handler_name),
            path_params: path.iter().map(|(k, v)| (Arc::from(*k), (*v).to_string())).collect(),
            query_params: query.iter().map(|(k, v)| (Arc::from(*k), (*v).to_string())).collect(),
            headers: HeaderVec::new(),
            format: None,
            reply_tx,
        };
        (req, reply_rx)
    }
}

/// Fully formatted response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// 200 with the encoder's media type.
    #[must_use]
    pub fn ok(media_type: &str, body: Vec<u8>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), media_type.to_string()));
        Self::new(200, headers, body)
    }

    /// Status with no body and no content type.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Vec::new())
    }

    /// Response for a request that did not produce a value.
    ///
    /// 404 and 406 are empty; 400 and 500 carry a fixed JSON body.
    #[must_use]
    pub fn from_error(err: &GatewayError) -> Self {
        let status = err.status();
        let body = match status {
            400 => BAD_REQUEST_BODY,
            500 => INTERNAL_ERROR_BODY,
            _ => return Self::empty(status),
        };
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, body.as_bytes().to_vec())
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }
}

/// Runs handlers on their worker pools and turns outcomes into responses.
///
/// Each dispatcher owns its pools, middleware and format selector; nothing
/// here is shared with another pipeline instance.
pub struct Dispatcher {
    pools: HashMap<String, WorkerPool>,
    middlewares: Vec<Arc<dyn Middleware>>,
    selector: FormatSelector,
}

impl Dispatcher {
    #[must_use]
    pub fn new(selector: FormatSelector) -> Self {
        Dispatcher {
            pools: HashMap::new(),
            middlewares: Vec::new(),
            selector,
        }
    }

    #[must_use]
    pub fn selector(&self) -> &FormatSelector {
        &self.selector
    }

    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    /// Worker pool serving `name`, if registered.
    #[must_use]
    pub fn pool(&self, name: &str) -> Option<&WorkerPool> {
        self.pools.get(name)
    }

    /// Executed in registration order, `before` and `after` alike.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Spawn the worker pool serving `name`.
    ///
    /// Handler panics are caught and reported as [`HandlerFault::Panicked`].
    /// A handler registered twice replaces the old pool; its workers exit
    /// once the old queue closes.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn()`, which is unsafe in the `may`
    /// runtime. The caller must make sure the runtime is configured and the
    /// handler does not block the worker thread for long.
    pub unsafe fn register_handler(
        &mut self,
        name: &str,
        handler_fn: HandlerFn,
        config: WorkerPoolConfig,
    ) -> io::Result<()> {
        // SAFETY: forwarded from this function's contract.
        let pool = unsafe { WorkerPool::spawn(name, config, handler_fn) }?;
        if self.pools.insert(name.to_string(), pool).is_some() {
            warn!(handler_name = %name, "Replaced existing handler");
        }
        info!(handler_name = %name, total_handlers = self.pools.len(), "Handler registered");
        Ok(())
    }

    /// Run a matched request through middleware, handler and encoder.
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        path: String,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> HandlerResponse {
        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path,
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            query_params: route_match.query_params,
            headers,
            format: route_match.format,
            reply_tx,
        };

        let mut early_resp: Option<HandlerResponse> = None;
        for mw in &self.middlewares {
            let resp = mw.before(&request);
            if early_resp.is_none() {
                early_resp = resp;
            }
        }

        let (mut resp, latency) = if let Some(r) = early_resp {
            debug!(request_id = %request.request_id, status = r.status, "Middleware returned early response");
            (r, Duration::ZERO)
        } else {
            let start = Instant::now();
            let outcome = self.invoke(&request, &reply_rx);
            let resp = self.respond(&request, outcome);
            (resp, start.elapsed())
        };

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }
        resp
    }

    fn invoke(
        &self,
        request: &HandlerRequest,
        reply_rx: &mpsc::Receiver<HandlerResult>,
    ) -> HandlerResult {
        let Some(pool) = self.pools.get(&*request.handler_name) else {
            error!(
                request_id = %request.request_id,
                handler_name = %request.handler_name,
                "Handler not registered"
            );
            return Err(HandlerFault::Unavailable);
        };
        pool.dispatch(request.clone())?;
        reply_rx.recv().unwrap_or_else(|e| {
            error!(
                request_id = %request.request_id,
                handler_name = %request.handler_name,
                error = %e,
                "Handler channel closed"
            );
            Err(HandlerFault::Unavailable)
        })
    }

    fn respond(&self, request: &HandlerRequest, outcome: HandlerResult) -> HandlerResponse {
        match self.render(request, outcome) {
            Ok(resp) => resp,
            Err(err) => {
                log_failure(request, &err);
                HandlerResponse::from_error(&err)
            }
        }
    }

    /// Absent → NotFound; otherwise select an encoder and encode.
    fn render(
        &self,
        request: &HandlerRequest,
        outcome: HandlerResult,
    ) -> Result<HandlerResponse, GatewayError> {
        let value = outcome?;
        if value.is_absent() {
            return Err(GatewayError::NotFound);
        }
        let selection = self
            .selector
            .select(request.format_token(), request.get_header("accept"))?;
        let body = selection.encoder.encode(&value)?;
        debug!(
            request_id = %request.request_id,
            encoder = selection.encoder.name(),
            media_type = %selection.media_type,
            selected_by = selection.selected_by.as_str(),
            shape = %value.shape(),
            body_bytes = body.len(),
            "Response encoded"
        );
        Ok(HandlerResponse::ok(&selection.media_type, body))
    }
}

fn log_failure(request: &HandlerRequest, err: &GatewayError) {
    let key = request.get_path_param("key").unwrap_or("");
    match err {
        GatewayError::NotFound => debug!(
            request_id = %request.request_id,
            operation = %request.handler_name,
            key = %key,
            "Resource not found"
        ),
        GatewayError::UnsupportedFormat { .. } | GatewayError::NotAcceptable { .. } => info!(
            request_id = %request.request_id,
            operation = %request.handler_name,
            status = err.status(),
            kind = err.kind(),
            reason = %err,
            "Format negotiation failed"
        ),
        GatewayError::HandlerFault(fault) if fault.is_client_error() => warn!(
            request_id = %request.request_id,
            operation = %request.handler_name,
            key = %key,
            error = %fault,
            "Rejected request parameters"
        ),
        GatewayError::HandlerFault(fault) => error!(
            request_id = %request.request_id,
            operation = %request.handler_name,
            key = %key,
            error = %fault,
            "Handler fault"
        ),
        GatewayError::EncodingFault(e) => error!(
            request_id = %request.request_id,
            operation = %request.handler_name,
            key = %key,
            error = %e,
            "Encoding fault"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encoders::JsonEncoder;
    use crate::format::{Encoder, EncodeError};
    use crate::store::StoreError;
    use crate::value::Shape;

    #[test]
    fn test_format_token_precedence() {
        let mut req = HandlerRequest::for_test("h", &[], &[("format", "csv")]);
        assert_eq!(req.format_token(), Some("csv"));
        req.format = Some("xml".into());
        assert_eq!(req.format_token(), Some("xml"));
        let req = HandlerRequest::for_test("h", &[], &[("format", "")]);
        assert_eq!(req.format_token(), None);
    }

    #[test]
    fn test_error_responses_hide_details() {
        let fault = GatewayError::HandlerFault(HandlerFault::Store(StoreError::Unavailable(
            "secret host 10.0.0.1".into(),
        )));
        let resp = HandlerResponse::from_error(&fault);
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, INTERNAL_ERROR_BODY.as_bytes());

        let resp = HandlerResponse::from_error(&GatewayError::EncodingFault(
            EncodeError::unsupported("prtg", Shape::Bytes),
        ));
        assert_eq!(resp.status, 500);

        let resp = HandlerResponse::from_error(&GatewayError::NotFound);
        assert_eq!(resp.status, 404);
        assert!(resp.body.is_empty());
        assert_eq!(resp.content_type(), None);
    }

    #[test]
    fn test_ok_response_content_type() {
        let body = JsonEncoder::default()
            .encode(&crate::value::ResultValue::Scalar(3))
            .unwrap();
        let resp = HandlerResponse::ok("application/json", body);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.body, b"3");
    }
}
