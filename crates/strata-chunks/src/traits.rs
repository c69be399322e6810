use strata_types::Hash;

use crate::chunk::Chunk;
use crate::error::ChunkResult;

/// A namespace-scoped content-addressed chunk store.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable; the key is the content hash. The store trusts
///   the hash supplied with each chunk and never verifies it on write.
/// - A missing chunk ([`Chunk::empty`]) or missing root ([`Hash::zero`])
///   is an expected outcome, not an error; callers branch on the sentinel.
/// - [`update_root`](ChunkStore::update_root) is a linearizable
///   compare-and-swap on the namespace's root pointer only.
/// - Operations after [`close`](ChunkStore::close) are caller bugs and
///   panic.
pub trait ChunkStore: Send + Sync {
    /// The namespace's current root pointer, or the zero sentinel if unset.
    fn root(&self) -> ChunkResult<Hash>;

    /// Optimistically advance the root pointer from `last` to `current`.
    ///
    /// Returns `Ok(false)` without side effects when the persisted root no
    /// longer equals `last`; the caller re-reads and retries. A successful
    /// update is durable before this returns.
    fn update_root(&self, current: Hash, last: Hash) -> ChunkResult<bool>;

    /// Read the chunk stored under `hash`, or the empty sentinel if absent.
    fn get(&self, hash: Hash) -> ChunkResult<Chunk>;

    /// Membership probe; does not pollute the engine's read cache.
    fn has(&self, hash: Hash) -> ChunkResult<bool>;

    /// Write one chunk under its hash.
    fn put(&self, chunk: Chunk) -> ChunkResult<()>;

    /// Write a set of chunks atomically: all visible or none.
    ///
    /// The returned [`Backpressure`] is advisory flow control, `None` under
    /// the default policy; callers must not treat it as an error.
    fn put_many(&self, chunks: Vec<Chunk>) -> ChunkResult<Option<Backpressure>>;

    /// Close the view, releasing the backing store if this view owns it.
    fn close(&self) -> ChunkResult<()>;
}

/// Hands out namespace views sharing one physical store.
pub trait StoreFactory: Send + Sync {
    /// Create a view over `namespace`. The view borrows the factory's
    /// physical store and never closes it.
    fn create_store(&self, namespace: &str) -> Box<dyn ChunkStore>;

    /// Close the shared physical store exactly once and invalidate the
    /// factory. Calling [`create_store`](StoreFactory::create_store)
    /// afterwards panics.
    fn shutter(&self) -> ChunkResult<()>;
}

/// Advisory flow-control signal from [`ChunkStore::put_many`].
///
/// Reserved for a future policy that asks callers to back off and retry
/// the named chunks; the default policy never produces one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backpressure {
    hashes: Vec<Hash>,
}

impl Backpressure {
    /// Signal backpressure on the given chunks.
    pub fn new(hashes: Vec<Hash>) -> Self {
        Self { hashes }
    }

    /// The chunks the caller should retry later.
    pub fn hashes(&self) -> &[Hash] {
        &self.hashes
    }
}
