// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronous string key-value persistence collaborator.

use hashbrown::HashMap;

/// A synchronous string key-value store.
///
/// This mirrors the storage surface the original theme used: string keys to
/// string values, read and written within a single turn. Durability and
/// quota handling are the host's concern; a failed write is simply invisible
/// to the core, which treats storage as best-effort.
pub trait KvStore {
    /// Read the value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str);

    /// Remove `key`, if present.
    fn remove(&mut self, key: &str);
}

/// In-memory [`KvStore`] backed by a hash map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("liked"), None);

        store.set("liked", "[\"p1\"]");
        assert_eq!(store.get("liked").as_deref(), Some("[\"p1\"]"));
        assert_eq!(store.len(), 1);

        store.set("liked", "[]");
        assert_eq!(store.get("liked").as_deref(), Some("[]"));

        store.remove("liked");
        assert!(store.is_empty());
    }
}
