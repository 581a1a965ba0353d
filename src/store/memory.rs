use std::collections::HashMap;
use std::sync::RwLock;

use super::{ListStore, StoreError};

/// Databases exposed by a store unless configured otherwise.
pub const DEFAULT_DATABASES: u16 = 16;

type Database = HashMap<String, Vec<Vec<u8>>>;

/// In-process list store.
///
/// Stands in for a real store client: seeded from configuration or tests,
/// then read concurrently. Database `-1` maps to database `0`.
#[derive(Debug)]
pub struct MemoryStore {
    databases: Vec<RwLock<Database>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_databases(DEFAULT_DATABASES)
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_databases(count: u16) -> Self {
        Self {
            databases: (0..count.max(1)).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn database(&self, db: i32) -> Result<&RwLock<Database>, StoreError> {
        let slot = if db == -1 { 0 } else { db };
        usize::try_from(slot)
            .ok()
            .and_then(|i| self.databases.get(i))
            .ok_or(StoreError::UnknownDatabase(db))
    }

    /// Append values to the tail of `key` (RPUSH).
    pub fn push<I, V>(&self, db: i32, key: &str, values: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let mut guard = self
            .database(db)?
            .write()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".into()))?;
        let list = guard.entry(key.to_string()).or_default();
        list.extend(values.into_iter().map(Into::into));
        Ok(list.len())
    }

    fn read<T>(
        &self,
        db: i32,
        key: &str,
        f: impl FnOnce(&[Vec<u8>]) -> T,
    ) -> Result<T, StoreError> {
        let guard = self
            .database(db)?
            .read()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".into()))?;
        Ok(f(guard.get(key).map(Vec::as_slice).unwrap_or_default()))
    }
}

/// Resolve a possibly negative index against `len`.
fn resolve(index: i64, len: usize) -> i64 {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    if index < 0 {
        len.saturating_add(index)
    } else {
        index
    }
}

impl ListStore for MemoryStore {
    fn length(&self, db: i32, key: &str) -> Result<i64, StoreError> {
        self.read(db, key, |list| i64::try_from(list.len()).unwrap_or(i64::MAX))
    }

    fn index(&self, db: i32, key: &str, index: i64) -> Result<Option<Vec<u8>>, StoreError> {
        self.read(db, key, |list| {
            let i = resolve(index, list.len());
            usize::try_from(i).ok().and_then(|i| list.get(i)).cloned()
        })
    }

    fn range(
        &self,
        db: i32,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        self.read(db, key, |list| {
            let len = list.len();
            let start = resolve(start, len).max(0);
            let stop = resolve(stop, len);
            let last = i64::try_from(len).unwrap_or(i64::MAX) - 1;
            let stop = stop.min(last);
            if start > stop {
                return Vec::new();
            }
            // Both bounds are within 0..len here.
            let (start, stop) = (start as usize, stop as usize);
            list[start..=stop].to_vec()
        })
    }
}
