//! # detectors
//!
//! A coroutine-powered HTTP gateway that exposes keyed-list operations on
//! external data stores and renders every result in one of many wire formats
//! chosen by content negotiation.
//!
//! ## Architecture
//!
//! - **[`value`]** - the result shapes handlers produce
//! - **[`format`]** - format registry, selector and the built-in encoders
//! - **[`store`]** - list store trait, connection catalog and scoped leases
//! - **[`handlers`]** - list operations (length, index, range)
//! - **[`router`]** - radix-tree routing with `.{format}` suffixes
//! - **[`dispatcher`]** - handler dispatch, middleware, negotiation, encoding
//! - **[`worker_pool`]** - per-handler pools of worker coroutines
//! - **[`pipeline`]** - registrations and built pipeline instances
//! - **[`secondary`]** - the process-wide in-process pipeline
//! - **[`checks`]** - scheduled checks through the secondary pipeline
//! - **[`server`]** - `may_minihttp` service for the primary pipeline
//!
//! ## Request Flow
//!
//! ```text
//! GET /api/redis/connection/local/list/mykey/range.csv?start=0&stop=-1
//!   → Router          (list_range, key=mykey, format=csv)
//!   → Dispatcher      (middleware before, handler worker pool)
//!   → ResultValue     (Sequence of Bytes)
//!   → FormatSelector  (explicit token csv)
//!   → CsvEncoder      (one row per element)
//!   → 200 application/vnd+detectors.csv
//! ```
//!
//! ## Two Instances
//!
//! Startup builds the primary pipeline for the listener, then builds a second
//! instance from the same [`pipeline::Registrations`] and installs it with
//! [`secondary::install`]. Other subsystems call [`secondary::invoke`] to get
//! fully formatted responses without a socket.
//!
//! ```rust,ignore
//! use detectors::pipeline::{build_named, gateway_registrations, PipelineRequest};
//!
//! let registrations = gateway_registrations(&catalog, Some("application/json"));
//! let primary = build_named(&registrations, "primary")?;
//! detectors::secondary::install(build_named(&registrations, "secondary")?)?;
//!
//! let resp = detectors::secondary::invoke(
//!     PipelineRequest::get("/api/redis/connection/local/list/mykey/length"),
//! )?;
//! ```

pub mod checks;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod handlers;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod runtime_config;
pub mod secondary;
pub mod server;
pub mod store;
pub mod value;
pub mod worker_pool;

pub use error::GatewayError;
pub use pipeline::{build, gateway_registrations, PipelineInstance, PipelineRequest, Registrations};
pub use value::{Element, ResultValue};
