//! # Runtime Configuration
//!
//! Coroutine runtime settings read from the environment at startup.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `DETECTORS_STACK_SIZE` | handler coroutine stack, decimal or `0x` hex | `0x8000` |
//! | `DETECTORS_WORKERS` | `may` worker threads | number of CPUs |
//! | `DETECTORS_HANDLER_WORKERS` | worker coroutines per handler | `4` |
//!
//! ```bash
//! export DETECTORS_STACK_SIZE=0x10000
//! detectors serve --config gateway.yaml
//! ```
//!
//! Both pipeline instances spawn a worker pool per list handler, so total
//! reserved stack is roughly `2 × 5 × handler_workers × stack_size`.

use std::env;

use crate::worker_pool::DEFAULT_HANDLER_WORKERS;

/// Default handler stack: 32 KB.
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for handler coroutines in bytes
    pub stack_size: usize,
    /// Worker threads for the `may` scheduler; `None` keeps the runtime default
    pub workers: Option<usize>,
    /// Worker coroutines serving each handler
    pub handler_workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: None,
            handler_workers: DEFAULT_HANDLER_WORKERS,
        }
    }
}

/// Parse `16384` or `0x4000`. Zero and garbage are rejected.
#[must_use]
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    };
    parsed.filter(|n| *n > 0)
}

impl RuntimeConfig {
    /// Load configuration from environment variables. Invalid values fall
    /// back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            stack_size: lookup("DETECTORS_STACK_SIZE")
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.stack_size),
            workers: lookup("DETECTORS_WORKERS").and_then(|v| parse_size(&v)),
            handler_workers: lookup("DETECTORS_HANDLER_WORKERS")
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.handler_workers),
        }
    }

    /// Push the settings into the global `may` configuration. Call before
    /// the first coroutine is spawned.
    pub fn apply(&self) {
        let config = may::config();
        config.set_stack_size(self.stack_size);
        if let Some(workers) = self.workers {
            config.set_workers(workers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("0x4000"), Some(0x4000));
        assert_eq!(parse_size(" 0X10 "), Some(16));
        assert_eq!(parse_size("0"), None);
        assert_eq!(parse_size("big"), None);
    }

    #[test]
    fn test_from_lookup() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("DETECTORS_STACK_SIZE", "0x10000"),
            ("DETECTORS_WORKERS", "4"),
            ("DETECTORS_HANDLER_WORKERS", "8"),
        ]));
        assert_eq!(config.stack_size, 0x10000);
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.handler_workers, 8);

        let config = RuntimeConfig::from_lookup(lookup(&[
            ("DETECTORS_STACK_SIZE", "lots"),
            ("DETECTORS_HANDLER_WORKERS", "0"),
        ]));
        assert_eq!(config, RuntimeConfig::default());
    }
}
