//! List store interface and connection catalog.
//!
//! Handlers never hold a store directly. They ask the [`ConnectionCatalog`]
//! for a [`StoreLease`] by connection id; the lease is released when it goes
//! out of scope, whichever way the handler exits.

mod memory;

pub use memory::{MemoryStore, DEFAULT_DATABASES};

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Database selector used when a route omits `/db/{dbId}`.
pub const DEFAULT_DB: i32 = -1;

/// Failure inside a store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The database index is outside what the store exposes
    UnknownDatabase(i32),
    /// The store is unreachable or refused the call
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownDatabase(db) => write!(f, "database {db} does not exist"),
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Read operations on keyed lists, with Redis indexing semantics.
///
/// Negative indexes count from the tail (`-1` is the last element). `range`
/// is inclusive of `stop`; bounds past either end are clamped and an empty
/// or inverted range yields no elements. A missing key behaves as an empty
/// list. `db == -1` selects the store's default database.
pub trait ListStore: Send + Sync {
    fn length(&self, db: i32, key: &str) -> Result<i64, StoreError>;

    /// Element at `index`, or `None` when out of range or the key is missing.
    fn index(&self, db: i32, key: &str, index: i64) -> Result<Option<Vec<u8>>, StoreError>;

    fn range(&self, db: i32, key: &str, start: i64, stop: i64)
        -> Result<Vec<Vec<u8>>, StoreError>;
}

/// Resolves connection ids to stores and hands out scoped leases.
#[derive(Clone, Default)]
pub struct ConnectionCatalog {
    connections: HashMap<String, Arc<dyn ListStore>>,
    active: Arc<AtomicUsize>,
}

impl ConnectionCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the store behind `connection_id`.
    pub fn insert(&mut self, connection_id: impl Into<String>, store: Arc<dyn ListStore>) {
        self.connections.insert(connection_id.into(), store);
    }

    #[must_use]
    pub fn with_connection(
        mut self,
        connection_id: impl Into<String>,
        store: Arc<dyn ListStore>,
    ) -> Self {
        self.insert(connection_id, store);
        self
    }

    /// Acquire a lease on `connection_id`, or `None` if it is not configured.
    #[must_use]
    pub fn lease(&self, connection_id: &str) -> Option<StoreLease> {
        let store = self.connections.get(connection_id)?;
        let active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(connection_id = %connection_id, active_leases = active, "Store lease acquired");
        Some(StoreLease {
            connection_id: Arc::from(connection_id),
            store: Arc::clone(store),
            active: Arc::clone(&self.active),
        })
    }

    /// Leases currently held across every connection.
    #[must_use]
    pub fn active_leases(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Configured connection ids, sorted.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.connections.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for ConnectionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCatalog")
            .field("connections", &self.connection_ids())
            .field("active_leases", &self.active_leases())
            .finish()
    }
}

/// Scoped handle on a store. Dereferences to the store; releases on drop.
pub struct StoreLease {
    connection_id: Arc<str>,
    store: Arc<dyn ListStore>,
    active: Arc<AtomicUsize>,
}

impl StoreLease {
    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }
}

impl Deref for StoreLease {
    type Target = dyn ListStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl Drop for StoreLease {
    fn drop(&mut self) {
        let remaining = self.active.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
        debug!(
            connection_id = %self.connection_id,
            active_leases = remaining,
            "Store lease released"
        );
    }
}
