use http::Method;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

use super::request::parse_request;
use super::response::{status_reason, write_response, ContentTypes};
use crate::middleware::MetricsMiddleware;
use crate::pipeline::PipelineInstance;

/// `may_minihttp` service bound to the primary pipeline.
///
/// `/health` and `/metrics` are answered here and never reach the pipeline.
#[derive(Clone)]
pub struct AppService {
    pipeline: Arc<PipelineInstance>,
    content_types: Arc<ContentTypes>,
}

impl AppService {
    #[must_use]
    pub fn new(pipeline: Arc<PipelineInstance>) -> Self {
        let content_types = Arc::new(ContentTypes::for_registry(pipeline.registry()));
        Self {
            pipeline,
            content_types,
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &PipelineInstance {
        &self.pipeline
    }
}

/// `{"status":"ok"}`
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    res.status_code(200, status_reason(200));
    res.header("Content-Type: application/json");
    res.body_vec(br#"{"status":"ok"}"#.to_vec());
    Ok(())
}

/// Prometheus text for one pipeline instance.
pub fn metrics_endpoint(res: &mut Response, metrics: &MetricsMiddleware, instance: &str) -> io::Result<()> {
    res.status_code(200, status_reason(200));
    res.header("Content-Type: text/plain; version=0.0.4");
    res.body_vec(metrics.render_prometheus(instance).into_bytes());
    Ok(())
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match parse_request(&req) {
            Ok(r) => r,
            Err(e) => {
                warn!(method = %req.method(), error = %e, "Unsupported HTTP method");
                res.status_code(405, status_reason(405));
                return Ok(());
            }
        };

        let (path, _) = request.path_and_query();
        if request.method == Method::GET {
            match path {
                "/health" => {
                    self.pipeline.metrics().inc_top_level_request();
                    return health_endpoint(res);
                }
                "/metrics" => {
                    self.pipeline.metrics().inc_top_level_request();
                    return metrics_endpoint(res, self.pipeline.metrics(), self.pipeline.label());
                }
                _ => {}
            }
        }

        let resp = self.pipeline.call(request);
        write_response(res, resp, &self.content_types);
        Ok(())
    }
}
