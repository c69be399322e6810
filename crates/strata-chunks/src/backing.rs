//! The physical store: one backing engine plus its synchronization state.
//!
//! A [`BackingStore`] owns exactly one [`KvEngine`] instance and is shared
//! by every namespace view projected over it. It contributes the two
//! synchronization primitives of the chunk layer (the bounded write gate
//! and the root-update mutex) plus best-effort operation counters.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use tracing::{debug, info};

use strata_types::Hash;

use crate::chunk::Chunk;
use crate::codec;
use crate::engine::{KvEngine, WriteBatch};
use crate::error::{ChunkError, ChunkResult};
use crate::rocks::RocksEngine;

/// Configuration for opening a physical store.
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Caps both the engine's open-file cache and the number of writes in
    /// flight at once.
    pub max_file_handles: usize,
    /// Emit get/has/put counters as a diagnostic summary on close.
    pub collect_stats: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_file_handles: 24,
            collect_stats: false,
        }
    }
}

/// Counting semaphore bounding concurrent engine writes.
///
/// Parallel ingestion pipelines fan writes out across threads; without a
/// bound they exhaust file handles and memory. Reads are not gated.
struct WriteGate {
    permits: Mutex<usize>,
    cv: Condvar,
}

struct WritePermit<'a> {
    gate: &'a WriteGate,
}

impl WriteGate {
    fn new(slots: usize) -> Self {
        Self {
            permits: Mutex::new(slots.max(1)),
            cv: Condvar::new(),
        }
    }

    /// Block until a slot is free, returning a permit that releases the
    /// slot on drop.
    fn acquire(&self) -> WritePermit<'_> {
        let mut permits = self.permits.lock().expect("gate lock poisoned");
        while *permits == 0 {
            permits = self.cv.wait(permits).expect("gate lock poisoned");
        }
        *permits -= 1;
        WritePermit { gate: self }
    }
}

impl Drop for WritePermit<'_> {
    fn drop(&mut self) {
        let mut permits = self.gate.permits.lock().expect("gate lock poisoned");
        *permits += 1;
        self.gate.cv.notify_one();
    }
}

/// Durable, concurrency-safe access to one embedded engine instance.
///
/// One `BackingStore` may back multiple logical namespaces; namespace
/// scoping is the caller's business (every key arriving here is already a
/// full key). All counters are statistics, never correctness-critical.
pub struct BackingStore {
    engine: Box<dyn KvEngine>,
    /// Serializes every root read-compare-write across all namespaces.
    root_mu: Mutex<()>,
    gate: WriteGate,
    closed: AtomicBool,
    collect_stats: bool,
    get_count: AtomicU64,
    has_count: AtomicU64,
    put_count: AtomicU64,
    put_bytes: AtomicU64,
}

impl BackingStore {
    /// Open a RocksDB-backed store at `dir`, creating the directory if
    /// absent. Directory or engine failure here is an unrecoverable
    /// startup error.
    pub fn open(dir: impl AsRef<Path>, opts: &StoreOptions) -> ChunkResult<Arc<Self>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| ChunkError::Open {
            dir: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let engine = RocksEngine::open(dir, opts.max_file_handles).map_err(|e| {
            ChunkError::Open {
                dir: dir.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(dir = %dir.display(), "opened backing store");
        Ok(Self::with_engine(Box::new(engine), opts))
    }

    /// Wrap an already-open engine (any adapter; tests use the in-memory
    /// one).
    pub fn with_engine(engine: Box<dyn KvEngine>, opts: &StoreOptions) -> Arc<Self> {
        Arc::new(Self {
            engine,
            root_mu: Mutex::new(()),
            gate: WriteGate::new(opts.max_file_handles),
            closed: AtomicBool::new(false),
            collect_stats: opts.collect_stats,
            get_count: AtomicU64::new(0),
            has_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            put_bytes: AtomicU64::new(0),
        })
    }

    fn ensure_open(&self) {
        assert!(
            !self.closed.load(Ordering::Acquire),
            "Cannot use BackingStore after close()"
        );
    }

    /// Read the root pointer at `key`. Absent roots are the zero-hash
    /// sentinel; an unparseable root is corruption.
    pub(crate) fn root_by_key(&self, key: &[u8]) -> ChunkResult<Hash> {
        self.ensure_open();
        match self.engine.get(key)? {
            None => Ok(Hash::zero()),
            Some(raw) => {
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| ChunkError::CorruptRoot(e.to_string()))?;
                Hash::from_hex(text).map_err(|e| ChunkError::CorruptRoot(e.to_string()))
            }
        }
    }

    /// Compare-and-swap the root pointer at `key`.
    ///
    /// Succeeds only if the persisted root still equals `last`; otherwise
    /// returns `Ok(false)` with no write attempted and the caller must
    /// re-read and retry. The winning write is flushed to stable storage
    /// before this returns.
    pub(crate) fn update_root_by_key(
        &self,
        key: &[u8],
        current: Hash,
        last: Hash,
    ) -> ChunkResult<bool> {
        self.ensure_open();
        let _guard = self.root_mu.lock().expect("root lock poisoned");
        if self.root_by_key(key)? != last {
            return Ok(false);
        }
        self.engine.put(key, current.to_hex().as_bytes(), true)?;
        Ok(true)
    }

    /// Read one chunk. Absence is normal (fresh clone, unreplicated chunk)
    /// and yields the empty sentinel.
    pub(crate) fn get_by_key(&self, key: &[u8], hash: Hash) -> ChunkResult<Chunk> {
        self.ensure_open();
        let raw = self.engine.get(key)?;
        self.get_count.fetch_add(1, Ordering::Relaxed);
        match raw {
            None => Ok(Chunk::empty()),
            Some(compressed) => {
                let data = codec::decompress(&compressed)?;
                Ok(Chunk::with_hash(hash, data))
            }
        }
    }

    /// Membership probe for one chunk key.
    pub(crate) fn has_by_key(&self, key: &[u8]) -> ChunkResult<bool> {
        self.ensure_open();
        let exists = self.engine.has(key)?;
        self.has_count.fetch_add(1, Ordering::Relaxed);
        Ok(exists)
    }

    /// Write one chunk, holding a write-gate slot for the duration.
    pub(crate) fn put_by_key(&self, key: &[u8], chunk: &Chunk) -> ChunkResult<()> {
        self.ensure_open();
        let _permit = self.gate.acquire();
        let data = codec::compress(chunk.data())?;
        self.engine.put(key, &data, false)?;
        self.put_count.fetch_add(1, Ordering::Relaxed);
        self.put_bytes.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Submit a pre-encoded batch through one write-gate slot as a single
    /// atomic unit.
    pub(crate) fn put_batch(&self, batch: WriteBatch) -> ChunkResult<()> {
        self.ensure_open();
        let entries = batch.len() as u64;
        let bytes = batch.payload_bytes();
        let _permit = self.gate.acquire();
        self.engine.write_batch(batch)?;
        self.put_count.fetch_add(entries, Ordering::Relaxed);
        self.put_bytes.fetch_add(bytes, Ordering::Relaxed);
        Ok(())
    }

    /// Close the engine. Closes exactly once; a second close is a caller
    /// bug. With stat collection enabled, logs a diagnostic summary.
    pub(crate) fn close(&self) -> ChunkResult<()> {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        assert!(!was_closed, "Cannot use BackingStore after close()");
        self.engine.close()?;
        if self.collect_stats {
            let puts = self.put_count.load(Ordering::Relaxed);
            let put_bytes = self.put_bytes.load(Ordering::Relaxed);
            info!(
                get_count = self.get_count.load(Ordering::Relaxed),
                has_count = self.has_count.load(Ordering::Relaxed),
                put_count = puts,
                avg_put_size = if puts == 0 { 0 } else { put_bytes / puts },
                "chunk store stats"
            );
        }
        debug!("closed backing store");
        Ok(())
    }

    /// Number of chunk reads served (including misses).
    pub fn get_count(&self) -> u64 {
        self.get_count.load(Ordering::Relaxed)
    }

    /// Number of membership probes served.
    pub fn has_count(&self) -> u64 {
        self.has_count.load(Ordering::Relaxed)
    }

    /// Number of chunks written (singles and batch entries).
    pub fn put_count(&self) -> u64 {
        self.put_count.load(Ordering::Relaxed)
    }

    /// Total compressed bytes written.
    pub fn put_bytes(&self) -> u64 {
        self.put_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;
    use std::thread;

    fn memory_store() -> Arc<BackingStore> {
        BackingStore::with_engine(Box::new(MemoryEngine::new()), &StoreOptions::default())
    }

    #[test]
    fn missing_root_is_zero_sentinel() {
        let store = memory_store();
        assert!(store.root_by_key(b"ns/root").unwrap().is_zero());
    }

    #[test]
    fn root_cas_from_zero() {
        let store = memory_store();
        let h1 = Hash::of(b"v1");
        assert!(store
            .update_root_by_key(b"ns/root", h1, Hash::zero())
            .unwrap());
        assert_eq!(store.root_by_key(b"ns/root").unwrap(), h1);
    }

    #[test]
    fn stale_cas_fails_without_side_effects() {
        let store = memory_store();
        let h1 = Hash::of(b"v1");
        let h2 = Hash::of(b"v2");
        store
            .update_root_by_key(b"ns/root", h1, Hash::zero())
            .unwrap();

        // `last` is stale (still claims zero), so the swap must fail and
        // leave the persisted root untouched.
        assert!(!store
            .update_root_by_key(b"ns/root", h2, Hash::zero())
            .unwrap());
        assert_eq!(store.root_by_key(b"ns/root").unwrap(), h1);
    }

    #[test]
    fn corrupt_root_is_an_error() {
        let store = memory_store();
        // A root key holding non-hex text fails as corruption, not absence.
        store.engine.put(b"ns/root", b"not hex", true).unwrap();
        let err = store.root_by_key(b"ns/root").unwrap_err();
        assert!(matches!(err, ChunkError::CorruptRoot(_)));
    }

    #[test]
    fn racing_cas_has_exactly_one_winner() {
        let store = memory_store();
        let h1 = Hash::of(b"left");
        let h2 = Hash::of(b"right");

        let mut handles = Vec::new();
        for current in [h1, h2] {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store
                    .update_root_by_key(b"ns/root", current, Hash::zero())
                    .unwrap()
            }));
        }
        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|won| **won).count(), 1);

        let root = store.root_by_key(b"ns/root").unwrap();
        assert!(root == h1 || root == h2);
    }

    #[test]
    fn get_and_put_counters() {
        let store = memory_store();
        let chunk = Chunk::new(b"counted".to_vec());
        store.put_by_key(b"k", &chunk).unwrap();
        store.get_by_key(b"k", chunk.hash()).unwrap();
        store.get_by_key(b"absent", Hash::zero()).unwrap();
        store.has_by_key(b"k").unwrap();

        assert_eq!(store.put_count(), 1);
        assert_eq!(store.get_count(), 2);
        assert_eq!(store.has_count(), 1);
        assert!(store.put_bytes() > 0);
    }

    #[test]
    fn concurrent_puts_through_the_gate() {
        let store = BackingStore::with_engine(
            Box::new(MemoryEngine::new()),
            &StoreOptions {
                max_file_handles: 2,
                collect_stats: false,
            },
        );

        let mut handles = Vec::new();
        for i in 0u32..16 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let chunk = Chunk::new(i.to_le_bytes().to_vec());
                let key = format!("chunk/{i}");
                store.put_by_key(key.as_bytes(), &chunk).unwrap();
            }));
        }
        for h in handles {
            h.join().expect("writer thread panicked");
        }
        assert_eq!(store.put_count(), 16);
    }

    #[test]
    #[should_panic(expected = "after close()")]
    fn use_after_close_panics() {
        let store = memory_store();
        store.close().unwrap();
        let _ = store.root_by_key(b"ns/root");
    }

    #[test]
    #[should_panic(expected = "after close()")]
    fn double_close_panics() {
        let store = memory_store();
        store.close().unwrap();
        let _ = store.close();
    }
}
