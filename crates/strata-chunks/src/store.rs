//! Namespace views and the store factory.
//!
//! A [`KvChunkStore`] projects one [`BackingStore`] onto one namespace:
//! every key it touches is `<ns>/root` or `<ns>/chunk/<digest>`. Multiple
//! views may share one backing store (via [`KvStoreFactory`]) so several
//! logical stores reuse one set of open file handles.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strata_types::Hash;

use crate::backing::{BackingStore, StoreOptions};
use crate::chunk::Chunk;
use crate::codec;
use crate::engine::{KvEngine, WriteBatch};
use crate::error::ChunkResult;
use crate::traits::{Backpressure, ChunkStore, StoreFactory};

const ROOT_SUFFIX: &[u8] = b"/root";
const CHUNK_SUFFIX: &[u8] = b"/chunk/";

/// One namespace projected over a shared [`BackingStore`].
pub struct KvChunkStore {
    backing: Arc<BackingStore>,
    root_key: Vec<u8>,
    chunk_prefix: Vec<u8>,
    /// Views created standalone own the backing store and close it;
    /// factory-created views only borrow it.
    owns_backing: bool,
    closed: AtomicBool,
}

impl KvChunkStore {
    /// Open a standalone store at `dir`, scoped to `namespace`. The view
    /// owns its backing store and closes it on [`ChunkStore::close`].
    pub fn open(
        dir: impl AsRef<Path>,
        namespace: &str,
        opts: &StoreOptions,
    ) -> ChunkResult<Self> {
        Ok(Self::new(BackingStore::open(dir, opts)?, namespace, true))
    }

    /// Standalone store over an already-open engine (any adapter).
    pub fn with_engine(
        engine: Box<dyn KvEngine>,
        namespace: &str,
        opts: &StoreOptions,
    ) -> Self {
        Self::new(BackingStore::with_engine(engine, opts), namespace, true)
    }

    fn new(backing: Arc<BackingStore>, namespace: &str, owns_backing: bool) -> Self {
        let ns_key = |suffix: &[u8]| {
            let mut key = Vec::with_capacity(namespace.len() + suffix.len());
            key.extend_from_slice(namespace.as_bytes());
            key.extend_from_slice(suffix);
            key
        };
        Self {
            backing,
            root_key: ns_key(ROOT_SUFFIX),
            chunk_prefix: ns_key(CHUNK_SUFFIX),
            owns_backing,
            closed: AtomicBool::new(false),
        }
    }

    /// Full engine key for a chunk hash. Allocates exactly once.
    fn chunk_key(&self, hash: &Hash) -> Vec<u8> {
        let digest = hash.as_bytes();
        let mut key = Vec::with_capacity(self.chunk_prefix.len() + digest.len());
        key.extend_from_slice(&self.chunk_prefix);
        key.extend_from_slice(digest);
        key
    }

    fn ensure_open(&self) {
        assert!(
            !self.closed.load(Ordering::Acquire),
            "Cannot use KvChunkStore after close()"
        );
    }
}

impl ChunkStore for KvChunkStore {
    fn root(&self) -> ChunkResult<Hash> {
        self.ensure_open();
        self.backing.root_by_key(&self.root_key)
    }

    fn update_root(&self, current: Hash, last: Hash) -> ChunkResult<bool> {
        self.ensure_open();
        self.backing
            .update_root_by_key(&self.root_key, current, last)
    }

    fn get(&self, hash: Hash) -> ChunkResult<Chunk> {
        self.ensure_open();
        self.backing.get_by_key(&self.chunk_key(&hash), hash)
    }

    fn has(&self, hash: Hash) -> ChunkResult<bool> {
        self.ensure_open();
        self.backing.has_by_key(&self.chunk_key(&hash))
    }

    fn put(&self, chunk: Chunk) -> ChunkResult<()> {
        self.ensure_open();
        self.backing.put_by_key(&self.chunk_key(&chunk.hash()), &chunk)
    }

    fn put_many(&self, chunks: Vec<Chunk>) -> ChunkResult<Option<Backpressure>> {
        self.ensure_open();
        let mut batch = WriteBatch::new();
        for chunk in &chunks {
            batch.put(self.chunk_key(&chunk.hash()), codec::compress(chunk.data())?);
        }
        self.backing.put_batch(batch)?;
        Ok(None)
    }

    fn close(&self) -> ChunkResult<()> {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        assert!(!was_closed, "Cannot use KvChunkStore after close()");
        if self.owns_backing {
            self.backing.close()?;
        }
        Ok(())
    }
}

/// Owns one [`BackingStore`] and hands out borrowing namespace views.
pub struct KvStoreFactory {
    backing: Arc<BackingStore>,
    shuttered: AtomicBool,
}

impl KvStoreFactory {
    /// Open a RocksDB-backed factory at `dir`.
    pub fn open(dir: impl AsRef<Path>, opts: &StoreOptions) -> ChunkResult<Self> {
        Ok(Self {
            backing: BackingStore::open(dir, opts)?,
            shuttered: AtomicBool::new(false),
        })
    }

    /// Factory over an already-open engine (any adapter).
    pub fn with_engine(engine: Box<dyn KvEngine>, opts: &StoreOptions) -> Self {
        Self {
            backing: BackingStore::with_engine(engine, opts),
            shuttered: AtomicBool::new(false),
        }
    }
}

impl StoreFactory for KvStoreFactory {
    fn create_store(&self, namespace: &str) -> Box<dyn ChunkStore> {
        assert!(
            !self.shuttered.load(Ordering::Acquire),
            "Cannot use KvStoreFactory after shutter()"
        );
        Box::new(KvChunkStore::new(
            Arc::clone(&self.backing),
            namespace,
            false,
        ))
    }

    fn shutter(&self) -> ChunkResult<()> {
        let was_shuttered = self.shuttered.swap(true, Ordering::AcqRel);
        assert!(
            !was_shuttered,
            "Cannot use KvStoreFactory after shutter()"
        );
        self.backing.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkError;
    use crate::memory::MemoryEngine;
    use std::sync::Arc;
    use std::thread;

    fn memory_chunk_store(ns: &str) -> KvChunkStore {
        KvChunkStore::with_engine(Box::new(MemoryEngine::new()), ns, &StoreOptions::default())
    }

    // -----------------------------------------------------------------------
    // Content round-trips
    // -----------------------------------------------------------------------

    #[test]
    fn put_then_get_returns_original_bytes() {
        let store = memory_chunk_store("db");
        let chunk = Chunk::new(b"row data goes here".to_vec());
        let hash = chunk.hash();
        store.put(chunk).unwrap();

        let read_back = store.get(hash).unwrap();
        assert_eq!(read_back.data(), b"row data goes here");
        assert_eq!(read_back.hash(), hash);
    }

    #[test]
    fn missing_chunk_is_empty_sentinel_not_error() {
        let store = memory_chunk_store("db");
        let absent = Hash::of(b"never written");
        assert!(!store.has(absent).unwrap());
        let chunk = store.get(absent).unwrap();
        assert!(chunk.is_empty());
    }

    #[test]
    fn put_many_then_get_all() {
        let store = memory_chunk_store("db");
        let chunks: Vec<Chunk> = (0u8..3).map(|i| Chunk::new(vec![i; 64])).collect();
        let hashes: Vec<Hash> = chunks.iter().map(Chunk::hash).collect();

        let backpressure = store.put_many(chunks).unwrap();
        assert!(backpressure.is_none());

        for (i, hash) in hashes.iter().enumerate() {
            let chunk = store.get(*hash).unwrap();
            assert_eq!(chunk.data(), vec![i as u8; 64]);
        }
    }

    #[test]
    fn put_many_is_atomic_under_engine_failure() {
        let engine = Arc::new(MemoryEngine::new());
        let store = KvChunkStore::new(
            BackingStore::with_engine(
                Box::new(SharedEngine(Arc::clone(&engine))),
                &StoreOptions::default(),
            ),
            "db",
            true,
        );

        let chunks: Vec<Chunk> = (0u8..3).map(|i| Chunk::new(vec![i; 16])).collect();
        let hashes: Vec<Hash> = chunks.iter().map(Chunk::hash).collect();

        engine.fail_next_write_batch();
        let err = store.put_many(chunks.clone()).unwrap_err();
        assert!(matches!(err, ChunkError::Engine(_)));
        for hash in &hashes {
            assert!(store.get(*hash).unwrap().is_empty());
        }

        // After the injected failure, the same batch lands whole.
        store.put_many(chunks).unwrap();
        for hash in &hashes {
            assert!(store.has(*hash).unwrap());
        }
    }

    /// Forwards to a shared in-memory engine so tests keep a handle to the
    /// failure-injection hook after the store takes ownership of the box.
    struct SharedEngine(Arc<MemoryEngine>);

    impl KvEngine for SharedEngine {
        fn get(&self, key: &[u8]) -> crate::error::EngineResult<Option<Vec<u8>>> {
            self.0.get(key)
        }
        fn has(&self, key: &[u8]) -> crate::error::EngineResult<bool> {
            self.0.has(key)
        }
        fn put(&self, key: &[u8], value: &[u8], sync: bool) -> crate::error::EngineResult<()> {
            self.0.put(key, value, sync)
        }
        fn write_batch(&self, batch: WriteBatch) -> crate::error::EngineResult<()> {
            self.0.write_batch(batch)
        }
        fn close(&self) -> crate::error::EngineResult<()> {
            self.0.close()
        }
    }

    // -----------------------------------------------------------------------
    // Root pointer
    // -----------------------------------------------------------------------

    #[test]
    fn fresh_store_root_lifecycle() {
        let store = memory_chunk_store("db");
        let h1 = Hash::of(b"first commit");
        let h2 = Hash::of(b"second commit");

        // Fresh store: zero sentinel.
        assert!(store.root().unwrap().is_zero());

        // Advance from zero succeeds.
        assert!(store.update_root(h1, Hash::zero()).unwrap());
        assert_eq!(store.root().unwrap(), h1);

        // Stale `last` fails and leaves the root alone.
        assert!(!store.update_root(h2, Hash::zero()).unwrap());
        assert_eq!(store.root().unwrap(), h1);

        // Correct `last` succeeds.
        assert!(store.update_root(h2, h1).unwrap());
        assert_eq!(store.root().unwrap(), h2);
    }

    #[test]
    fn racing_root_updates_one_winner() {
        let store = Arc::new(memory_chunk_store("db"));
        let a = Hash::of(b"a");
        let b = Hash::of(b"b");

        let mut handles = Vec::new();
        for current in [a, b] {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store.update_root(current, Hash::zero()).unwrap()
            }));
        }
        let wins: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
    }

    // -----------------------------------------------------------------------
    // Namespacing
    // -----------------------------------------------------------------------

    #[test]
    fn factory_views_share_engine_but_not_namespaces() {
        let factory = KvStoreFactory::with_engine(
            Box::new(MemoryEngine::new()),
            &StoreOptions::default(),
        );
        let left = factory.create_store("left");
        let right = factory.create_store("right");

        let chunk = Chunk::new(b"only in left".to_vec());
        let hash = chunk.hash();
        left.put(chunk).unwrap();
        left.update_root(hash, Hash::zero()).unwrap();

        // Same engine underneath, but nothing leaks across namespaces.
        assert!(left.has(hash).unwrap());
        assert!(!right.has(hash).unwrap());
        assert!(right.root().unwrap().is_zero());

        left.close().unwrap();
        right.close().unwrap();
        factory.shutter().unwrap();
    }

    #[test]
    fn borrowing_view_close_leaves_backing_open() {
        let factory = KvStoreFactory::with_engine(
            Box::new(MemoryEngine::new()),
            &StoreOptions::default(),
        );
        let first = factory.create_store("one");
        let second = factory.create_store("two");

        first.close().unwrap();

        // The backing store is still alive for the other view.
        let chunk = Chunk::new(b"still writable".to_vec());
        let hash = chunk.hash();
        second.put(chunk).unwrap();
        assert!(second.has(hash).unwrap());

        factory.shutter().unwrap();
    }

    // -----------------------------------------------------------------------
    // Lifecycle faults
    // -----------------------------------------------------------------------

    #[test]
    #[should_panic(expected = "Cannot use KvChunkStore after close()")]
    fn use_after_close_panics() {
        let store = memory_chunk_store("db");
        store.close().unwrap();
        let _ = store.root();
    }

    #[test]
    #[should_panic(expected = "Cannot use KvStoreFactory after shutter()")]
    fn create_store_after_shutter_panics() {
        let factory = KvStoreFactory::with_engine(
            Box::new(MemoryEngine::new()),
            &StoreOptions::default(),
        );
        factory.shutter().unwrap();
        let _ = factory.create_store("late");
    }

    #[test]
    #[should_panic(expected = "Cannot use KvChunkStore after close()")]
    fn borrowed_view_faults_after_its_own_close() {
        let factory = KvStoreFactory::with_engine(
            Box::new(MemoryEngine::new()),
            &StoreOptions::default(),
        );
        let view = factory.create_store("ns");
        view.close().unwrap();
        let _ = view.has(Hash::of(b"x"));
    }
}
