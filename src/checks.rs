//! Scheduled checks run through the secondary pipeline.
//!
//! Each configured check gets its own coroutine that issues a synthesized GET
//! every `interval_secs` and logs the outcome. Checks never touch the primary
//! instance, so they do not show up in its metrics.

use std::io;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::CheckConfig;
use crate::dispatcher::HandlerResponse;
use crate::pipeline::PipelineRequest;
use crate::secondary::{self, SecondaryError};

const CHECK_STACK_SIZE: usize = 0x8000;

/// Outcome of one check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub name: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: usize,
}

impl CheckReport {
    fn from_response(name: &str, resp: &HandlerResponse) -> Self {
        Self {
            name: name.to_string(),
            status: resp.status,
            content_type: resp.content_type().map(str::to_string),
            body_bytes: resp.body.len(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request a check sends.
#[must_use]
pub fn check_request(check: &CheckConfig) -> PipelineRequest {
    let request = PipelineRequest::get(check.path.as_str());
    match &check.accept {
        Some(accept) => request.header("accept", accept.as_str()),
        None => request,
    }
}

/// Run `check` once through the process-wide secondary pipeline.
///
/// # Errors
///
/// [`SecondaryError::NotInstalled`] when startup has not installed it yet.
pub fn run_check(check: &CheckConfig) -> Result<CheckReport, SecondaryError> {
    let resp = secondary::invoke(check_request(check))?;
    let report = CheckReport::from_response(&check.name, &resp);
    if report.is_success() {
        info!(
            check = %report.name,
            path = %check.path,
            status = report.status,
            content_type = report.content_type.as_deref().unwrap_or("-"),
            body_bytes = report.body_bytes,
            "Check passed"
        );
    } else {
        warn!(
            check = %report.name,
            path = %check.path,
            status = report.status,
            body_bytes = report.body_bytes,
            "Check failed"
        );
    }
    Ok(report)
}

/// Spawn one coroutine per check. The coroutines run for the life of the
/// process.
///
/// # Errors
///
/// Returns the spawn error of the first coroutine that fails to start.
pub fn spawn_checks(checks: &[CheckConfig]) -> io::Result<usize> {
    for check in checks {
        let interval = Duration::from_secs(check.interval_secs);
        let task = check.clone();
        // SAFETY: the loop only sleeps through may and calls the secondary
        // pipeline, which never blocks the worker thread.
        unsafe {
            may::coroutine::Builder::new()
                .name(format!("check:{}", task.name))
                .stack_size(CHECK_STACK_SIZE)
                .spawn::<_, ()>(move || loop {
                    if let Err(e) = run_check(&task) {
                        error!(check = %task.name, error = %e, "Check could not run");
                    }
                    may::coroutine::sleep(interval);
                })
        }?;
        info!(check = %check.name, interval_secs = check.interval_secs, "Check scheduled");
    }
    Ok(checks.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(accept: Option<&str>) -> CheckConfig {
        CheckConfig {
            name: "len".into(),
            path: "/api/redis/connection/local/list/mykey/length?x=1".into(),
            accept: accept.map(str::to_string),
            interval_secs: 5,
        }
    }

    #[test]
    fn test_check_request() {
        let req = check_request(&check(Some("text/plain")));
        assert_eq!(req.method, http::Method::GET);
        assert_eq!(req.path_and_query().1, "x=1");
        assert_eq!(req.headers.len(), 1);
        assert!(check_request(&check(None)).headers.is_empty());
    }

    #[test]
    fn test_spawn_checks_schedules_each_check() {
        may::config().set_stack_size(0x8000);
        assert_eq!(spawn_checks(&[]).unwrap(), 0);
        let mut slow = check(None);
        slow.interval_secs = 3600;
        assert_eq!(spawn_checks(&[slow]).unwrap(), 1);
    }

    #[test]
    fn test_report_success_range() {
        let mut resp = HandlerResponse::ok("application/json", b"3".to_vec());
        let report = CheckReport::from_response("len", &resp);
        assert!(report.is_success());
        assert_eq!(report.content_type.as_deref(), Some("application/json"));
        assert_eq!(report.body_bytes, 1);
        resp.status = 404;
        assert!(!CheckReport::from_response("len", &resp).is_success());
    }
}
