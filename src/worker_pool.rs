//! # Worker Pool Module
//!
//! Each registered handler is served by a pool of coroutines that share one
//! request queue. A worker suspended in a store call leaves the others free,
//! so requests for the same operation run concurrently.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `DETECTORS_HANDLER_WORKERS` | worker coroutines per handler | `4` |
//! | `DETECTORS_STACK_SIZE` | stack of each worker | `0x8000` |
//!
//! Both pipeline instances build their own pools, so the process runs
//! `2 × handlers × num_workers` handler coroutines.

use may::coroutine;
use may::sync::mpsc;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dispatcher::HandlerRequest;
use crate::handlers::{HandlerFault, HandlerFn};
use crate::runtime_config::DEFAULT_STACK_SIZE;

/// Worker coroutines per handler unless configured otherwise.
pub const DEFAULT_HANDLER_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of worker coroutines, at least one
    pub num_workers: usize,
    /// Stack size for each worker coroutine
    pub stack_size: usize,
}

impl WorkerPoolConfig {
    #[must_use]
    pub fn new(num_workers: usize, stack_size: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            stack_size,
        }
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLER_WORKERS, DEFAULT_STACK_SIZE)
    }
}

/// Counters for one pool.
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    dispatched: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl WorkerPoolMetrics {
    fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn panic_count(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }

    /// Requests queued or in flight (approximate).
    #[must_use]
    pub fn queue_depth(&self) -> u64 {
        self.dispatched_count().saturating_sub(self.completed_count())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn serve(
    handler_name: &str,
    worker_id: usize,
    handler_fn: &HandlerFn,
    metrics: &WorkerPoolMetrics,
    req: HandlerRequest,
) {
    let execution_start = Instant::now();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler_fn(&req)))
        .unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            metrics.record_panic();
            error!(
                request_id = %req.request_id,
                handler_name = %handler_name,
                worker_id,
                panic_message = %message,
                "Handler panicked"
            );
            Err(HandlerFault::Panicked(message))
        });
    debug!(
        request_id = %req.request_id,
        handler_name = %handler_name,
        worker_id,
        execution_time_us = execution_start.elapsed().as_micros(),
        ok = outcome.is_ok(),
        "Handler execution complete"
    );
    metrics.record_completion();
    if req.reply_tx.send(outcome).is_err() {
        warn!(
            request_id = %req.request_id,
            handler_name = %handler_name,
            "Dispatcher stopped waiting for handler reply"
        );
    }
}

/// Handler coroutines sharing one request queue.
///
/// Dropping the pool closes the queue; idle workers exit and busy ones exit
/// after their current request.
pub struct WorkerPool {
    handler_name: Arc<str>,
    config: WorkerPoolConfig,
    sender: mpsc::Sender<HandlerRequest>,
    metrics: Arc<WorkerPoolMetrics>,
}

impl WorkerPool {
    /// Spawn `config.num_workers` coroutines running `handler_fn`.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn()`, which is unsafe in the `may`
    /// runtime. The runtime must be configured and the handler must not block
    /// the worker thread for long.
    ///
    /// # Errors
    ///
    /// Returns the spawn error of the first worker that fails to start.
    pub unsafe fn spawn(
        handler_name: &str,
        config: WorkerPoolConfig,
        handler_fn: HandlerFn,
    ) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let rx = Arc::new(rx);
        let metrics = Arc::new(WorkerPoolMetrics::default());
        let name: Arc<str> = Arc::from(handler_name);

        for worker_id in 0..config.num_workers {
            let rx = Arc::clone(&rx);
            let handler_fn = Arc::clone(&handler_fn);
            let metrics = Arc::clone(&metrics);
            let worker_name = Arc::clone(&name);

            // SAFETY: see the function-level contract; the closure only owns
            // Send + 'static data.
            unsafe {
                coroutine::Builder::new()
                    .name(format!("handler:{handler_name}:{worker_id}"))
                    .stack_size(config.stack_size)
                    .spawn(move || {
                        debug!(handler_name = %worker_name, worker_id, "Worker coroutine start");
                        while let Ok(req) = rx.recv() {
                            serve(&worker_name, worker_id, &handler_fn, &metrics, req);
                        }
                        debug!(handler_name = %worker_name, worker_id, "Worker coroutine exit");
                    })
            }
            .map_err(|e| {
                error!(
                    handler_name = %handler_name,
                    worker_id,
                    error = %e,
                    stack_size = config.stack_size,
                    "Failed to spawn worker coroutine"
                );
                e
            })?;
        }

        info!(
            handler_name = %handler_name,
            num_workers = config.num_workers,
            stack_size = config.stack_size,
            "Worker pool started"
        );
        Ok(Self {
            handler_name: name,
            config,
            sender: tx,
            metrics,
        })
    }

    /// Queue `req` for the next free worker.
    ///
    /// # Errors
    ///
    /// [`HandlerFault::Unavailable`] when every worker has exited.
    pub fn dispatch(&self, req: HandlerRequest) -> Result<(), HandlerFault> {
        let request_id = req.request_id;
        if self.sender.send(req).is_err() {
            error!(
                request_id = %request_id,
                handler_name = %self.handler_name,
                "Worker pool queue closed"
            );
            return Err(HandlerFault::Unavailable);
        }
        self.metrics.record_dispatch();
        Ok(())
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    #[must_use]
    pub fn config(&self) -> WorkerPoolConfig {
        self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &WorkerPoolMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerResult;
    use crate::value::ResultValue;
    use std::time::Duration;

    #[test]
    fn test_config_has_at_least_one_worker() {
        assert_eq!(WorkerPoolConfig::new(0, 0x4000).num_workers, 1);
        assert_eq!(WorkerPoolConfig::default().num_workers, DEFAULT_HANDLER_WORKERS);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }

    #[test]
    fn test_pool_serves_and_survives_panics() {
        may::config().set_stack_size(0x8000);
        let handler: HandlerFn = Arc::new(|req: &HandlerRequest| -> HandlerResult {
            if req.get_path_param("mode") == Some("panic") {
                panic!("boom");
            }
            Ok(ResultValue::Scalar(1))
        });
        let pool = unsafe { WorkerPool::spawn("h", WorkerPoolConfig::new(2, 0x8000), handler) }
            .unwrap();

        for mode in ["panic", "ok", "panic", "ok"] {
            let (req, rx) = HandlerRequest::for_test_with_reply("h", &[("mode", mode)], &[]);
            pool.dispatch(req).unwrap();
            let outcome = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if mode == "panic" {
                assert_eq!(outcome, Err(HandlerFault::Panicked("boom".into())));
            } else {
                assert_eq!(outcome, Ok(ResultValue::Scalar(1)));
            }
        }
        assert_eq!(pool.metrics().dispatched_count(), 4);
        assert_eq!(pool.metrics().completed_count(), 4);
        assert_eq!(pool.metrics().panic_count(), 2);
        assert_eq!(pool.metrics().queue_depth(), 0);
    }
}
