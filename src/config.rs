//! # Gateway Configuration
//!
//! YAML file passed with `--config`:
//!
//! ```yaml
//! http:
//!   addr: "0.0.0.0:8080"
//! formats:
//!   default_media_type: application/json   # null disables the default
//! connections:
//!   - id: local
//!     databases: 16
//!     lists:
//!       - key: mykey
//!         values: [A, B, C]
//!       - key: blobs
//!         db: 2
//!         encoding: base64
//!         values: ["/wA="]
//! checks:
//!   - name: mykey-length
//!     path: /api/redis/connection/local/list/mykey/length
//!     accept: application/json
//!     interval_secs: 30
//! ```
//!
//! Every section is optional. `connections` seeds in-memory list stores that
//! stand in for external store clients.

use anyhow::{bail, Context};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::pipeline::DEFAULT_MEDIA_TYPE;
use crate::store::{ConnectionCatalog, MemoryStore, DEFAULT_DATABASES, DEFAULT_DB};

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_media_type() -> Option<String> {
    Some(DEFAULT_MEDIA_TYPE.to_string())
}

fn default_databases() -> u16 {
    DEFAULT_DATABASES
}

fn default_db() -> i32 {
    DEFAULT_DB
}

fn default_interval() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatsConfig {
    /// Used when a request has no format token and no usable Accept header
    #[serde(default = "default_media_type")]
    pub default_media_type: Option<String>,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            default_media_type: default_media_type(),
        }
    }
}

/// How seeded list values are written in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    #[default]
    Text,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSeed {
    pub key: String,
    #[serde(default = "default_db")]
    pub db: i32,
    #[serde(default)]
    pub encoding: ValueEncoding,
    #[serde(default)]
    pub values: Vec<String>,
}

impl ListSeed {
    fn decoded_values(&self) -> anyhow::Result<Vec<Vec<u8>>> {
        match self.encoding {
            ValueEncoding::Text => Ok(self.values.iter().map(|v| v.as_bytes().to_vec()).collect()),
            ValueEncoding::Base64 => self
                .values
                .iter()
                .map(|v| {
                    base64::engine::general_purpose::STANDARD
                        .decode(v)
                        .with_context(|| format!("invalid base64 value in list '{}'", self.key))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: String,
    #[serde(default = "default_databases")]
    pub databases: u16,
    #[serde(default)]
    pub lists: Vec<ListSeed>,
}

/// A periodic request through the secondary pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    /// Full request path including the base path, optionally with a query
    pub path: String,
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub formats: FormatsConfig,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

impl GatewayConfig {
    /// Read and validate a YAML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        info!(
            path = %path.display(),
            connections = config.connections.len(),
            checks = config.checks.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut ids = HashSet::new();
        for conn in &self.connections {
            if conn.id.is_empty() {
                bail!("connection id must not be empty");
            }
            if !ids.insert(conn.id.as_str()) {
                bail!("duplicate connection id '{}'", conn.id);
            }
        }
        let mut names = HashSet::new();
        for check in &self.checks {
            if !names.insert(check.name.as_str()) {
                bail!("duplicate check name '{}'", check.name);
            }
            if !check.path.starts_with('/') {
                bail!("check '{}' path must start with '/'", check.name);
            }
            if check.interval_secs == 0 {
                bail!("check '{}' interval_secs must be positive", check.name);
            }
        }
        Ok(())
    }

    /// Build the connection catalog, seeding each in-memory store.
    pub fn catalog(&self) -> anyhow::Result<ConnectionCatalog> {
        let mut catalog = ConnectionCatalog::new();
        for conn in &self.connections {
            let store = MemoryStore::with_databases(conn.databases);
            for seed in &conn.lists {
                let values = seed.decoded_values()?;
                let len = store.push(seed.db, &seed.key, values).with_context(|| {
                    format!(
                        "failed to seed list '{}' in db {} of connection '{}'",
                        seed.key, seed.db, conn.id
                    )
                })?;
                debug!(connection_id = %conn.id, db = seed.db, key = %seed.key, len, "Seeded list");
            }
            catalog.insert(conn.id.clone(), Arc::new(store));
        }
        Ok(catalog)
    }
}
