//! # Dispatcher Module
//!
//! Coroutine-based handler dispatch plus the response half of the pipeline.
//!
//! ## Request Flow
//!
//! 1. The router matches the request and extracts path params and the
//!    optional `.{format}` token
//! 2. Middleware `before` hooks run; any of them may answer early
//! 3. The request is queued on the handler's
//!    [`WorkerPool`](crate::worker_pool::WorkerPool); the first free worker
//!    coroutine runs it and the dispatcher waits for its [`HandlerResult`](crate::handlers::HandlerResult)
//! 4. `Absent` becomes an empty 404; a fault becomes 400 or a generic 500
//! 5. Otherwise the [`FormatSelector`](crate::format::FormatSelector) picks an
//!    encoder, the value is encoded and sent as 200
//! 6. Middleware `after` hooks see the final response and latency
//!
//! Worker coroutines are spawned once at build time. Pool size and stack size
//! come from [`RuntimeConfig`](crate::runtime_config::RuntimeConfig).

mod core;

pub use core::{
    Dispatcher, HandlerRequest, HandlerResponse, HeaderVec, BAD_REQUEST_BODY,
    INTERNAL_ERROR_BODY, MAX_INLINE_HEADERS,
};
