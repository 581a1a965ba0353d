use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Request counters for one pipeline instance.
///
/// All counters are atomics updated with `Ordering::Relaxed`; readings are
/// eventually consistent. Each pipeline instance owns its own collector, so
/// traffic through the secondary never shows up in the primary's numbers.
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    success: AtomicUsize,
    not_found: AtomicUsize,
    not_acceptable: AtomicUsize,
    bad_request: AtomicUsize,
    server_errors: AtomicUsize,
    bytes_sent: AtomicU64,
    top_level_requests: AtomicUsize,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean dispatch latency, zero before the first request.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.success.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn not_found_count(&self) -> usize {
        self.not_found.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn not_acceptable_count(&self) -> usize {
        self.not_acceptable.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bad_request_count(&self) -> usize {
        self.bad_request.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn server_error_count(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Count a request answered outside the dispatcher (`/health`, `/metrics`,
    /// unknown routes).
    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition, labelled with the instance name.
    #[must_use]
    pub fn render_prometheus(&self, instance: &str) -> String {
        let mut out = String::with_capacity(1024);
        let counters: [(&str, &str, u64); 4] = [
            (
                "detectors_requests_total",
                "Requests dispatched to list handlers",
                self.request_count() as u64,
            ),
            (
                "detectors_top_level_requests_total",
                "Requests answered without a handler",
                self.top_level_request_count() as u64,
            ),
            (
                "detectors_response_bytes_total",
                "Encoded body bytes sent",
                self.bytes_sent.load(Ordering::Relaxed),
            ),
            (
                "detectors_request_latency_nanoseconds_total",
                "Total dispatch latency",
                self.total_latency_ns.load(Ordering::Relaxed),
            ),
        ];
        for (name, help, value) in counters {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name}{{instance=\"{instance}\"}} {value}\n"
            ));
        }

        out.push_str("# HELP detectors_responses_total Responses by status code\n");
        out.push_str("# TYPE detectors_responses_total counter\n");
        for (code, value) in [
            ("200", self.success_count()),
            ("400", self.bad_request_count()),
            ("404", self.not_found_count()),
            ("406", self.not_acceptable_count()),
            ("500", self.server_error_count()),
        ] {
            out.push_str(&format!(
                "detectors_responses_total{{instance=\"{instance}\",code=\"{code}\"}} {value}\n"
            ));
        }

        out.push_str("# HELP detectors_request_latency_average_seconds Mean dispatch latency\n");
        out.push_str("# TYPE detectors_request_latency_average_seconds gauge\n");
        out.push_str(&format!(
            "detectors_request_latency_average_seconds{{instance=\"{instance}\"}} {:.6}\n",
            self.average_latency().as_secs_f64()
        ));
        out
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns.fetch_add(
            u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        self.bytes_sent
            .fetch_add(res.body.len() as u64, Ordering::Relaxed);
        let bucket = match res.status {
            200..=299 => &self.success,
            404 => &self.not_found,
            406 => &self.not_acceptable,
            400..=499 => &self.bad_request,
            _ => &self.server_errors,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }
}
