//! # CLI Module
//!
//! ```bash
//! # Serve the primary pipeline and run scheduled checks
//! detectors serve --config gateway.yaml --addr 127.0.0.1:8080
//!
//! # One request through the in-process secondary pipeline
//! detectors invoke --config gateway.yaml \
//!     --path /api/redis/connection/local/list/mykey/range.csv
//!
//! # Token table
//! detectors formats
//! ```
//!
//! `DETECTORS_CONFIG` may stand in for `--config`.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{
    format_table, install_secondary, registrations_for, run_cli, start_pipelines, Cli, Commands,
};
