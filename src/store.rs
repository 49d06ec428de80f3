use bytes::Bytes;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The Store holds the string table and the hash table shared by every connection. Each table sits
/// behind its own reader/writer lock, so string commands never contend with hash commands.
///
/// Cloning a store is cheap and yields a handle to the same tables.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        Self::default()
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

type Key = Bytes;
type Hash = HashMap<Bytes, Bytes>;

#[derive(Default)]
pub struct InnerStore {
    strings: RwLock<HashMap<Key, Bytes>>,
    hashes: RwLock<HashMap<Key, Hash>>,
}

impl InnerStore {
    pub fn set(&self, key: Key, value: Bytes) {
        self.strings_mut().insert(key, value);
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.strings().get(key).cloned()
    }

    /// Sets `field` in the hash stored at `key`, creating the hash first if needed.
    pub fn hset(&self, key: Key, field: Bytes, value: Bytes) {
        self.hashes_mut()
            .entry(key)
            .or_default()
            .insert(field, value);
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.hashes()
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned()
    }

    /// Returns every field/value pair of the hash at `key`, in no particular order, or `None` if
    /// the hash was never written.
    pub fn hgetall(&self, key: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.hashes().get(key).map(|hash| {
            hash.iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        })
    }

    // Every mutation is a single insert, so a table is never left half-written by a panicking
    // holder and a poisoned lock can be reused as is.

    fn strings(&self) -> RwLockReadGuard<'_, HashMap<Key, Bytes>> {
        self.strings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn strings_mut(&self) -> RwLockWriteGuard<'_, HashMap<Key, Bytes>> {
        self.strings.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn hashes(&self) -> RwLockReadGuard<'_, HashMap<Key, Hash>> {
        self.hashes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn hashes_mut(&self) -> RwLockWriteGuard<'_, HashMap<Key, Hash>> {
        self.hashes.write().unwrap_or_else(PoisonError::into_inner)
    }
}
