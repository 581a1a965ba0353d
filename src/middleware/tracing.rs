use std::time::Duration;

use tracing::{debug, info, warn};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Logs one line per completed request, tagged with its request id.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler = %req.handler_name,
            "Request dispatched"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        if res.status >= 500 {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "Request failed"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                handler = %req.handler_name,
                status = res.status,
                content_type = res.content_type().unwrap_or("-"),
                body_bytes = res.body.len(),
                latency_ms,
                "Request completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_leaves_response_untouched() {
        let req = HandlerRequest::for_test("list_length", &[], &[]);
        let mut res = HandlerResponse::ok("application/json", b"3".to_vec());
        let expected = res.clone();
        TracingMiddleware.after(&req, &mut res, Duration::from_millis(2));
        assert_eq!(res, expected);
        assert!(TracingMiddleware.before(&req).is_none());
    }
}
