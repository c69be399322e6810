//! In-memory backing engine for tests and embedding.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::engine::{KvEngine, WriteBatch};
use crate::error::{EngineError, EngineResult};

/// A `BTreeMap`-backed [`KvEngine`].
///
/// Ordered like the real engine, atomic batches under a single write lock,
/// no durability. Data is lost when the engine is dropped.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    fail_next_batch: AtomicBool,
}

impl MemoryEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.map.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.map.read().expect("lock poisoned").is_empty()
    }

    /// Make the next `write_batch` call fail before applying any entry.
    ///
    /// Test hook for exercising batch atomicity under engine failure.
    pub fn fail_next_write_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let map = self.map.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> EngineResult<bool> {
        let map = self.map.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn put(&self, key: &[u8], value: &[u8], _sync: bool) -> EngineResult<()> {
        let mut map = self.map.write().expect("lock poisoned");
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> EngineResult<()> {
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Backend(
                "injected write_batch failure".to_string(),
            ));
        }
        // One write lock for the whole batch keeps it atomic with respect
        // to every other operation on this engine.
        let mut map = self.map.write().expect("lock poisoned");
        for (key, value) in batch.entries() {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn close(&self) -> EngineResult<()> {
        Ok(())
    }
}
