//! Content-addressed chunk storage for Strata.
//!
//! This crate implements the durable half of the persistence core: immutable
//! byte blobs ([`Chunk`]s) keyed by their BLAKE3 content hash, stored in an
//! embedded ordered key-value engine, with one mutable root pointer per
//! namespace advanced by optimistic compare-and-swap.
//!
//! # Key Types
//!
//! - [`Chunk`] — immutable content-addressed byte blob
//! - [`KvEngine`] — adapter trait over the embedded engine
//!   ([`RocksEngine`] for disk, [`MemoryEngine`] for tests and embedding)
//! - [`BackingStore`] — one engine instance plus its write gate, root mutex,
//!   and operation counters; shared by every namespace view
//! - [`ChunkStore`] / [`KvChunkStore`] — the namespace-scoped store surface
//! - [`StoreFactory`] / [`KvStoreFactory`] — namespace views over one shared
//!   backing store, with single-owner shutdown
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written; the key is the content hash. The
//!    store trusts the caller's hash on write and never re-verifies it.
//! 2. A missing chunk or missing root is a normal outcome, not an error:
//!    reads return sentinels ([`Chunk::empty`], [`Hash::zero`]).
//! 3. Root updates are serialized per backing store and optimistic: an
//!    update that loses the race returns `Ok(false)` with no side effects.
//! 4. Writes pass through a bounded-concurrency gate; a batch occupies one
//!    slot and is atomic as a set.
//! 5. Using a store or factory after closing it is a caller bug and panics.
//!
//! [`Hash::zero`]: strata_types::Hash::zero

pub mod backing;
pub mod chunk;
pub mod codec;
pub mod engine;
pub mod error;
pub mod memory;
pub mod rocks;
pub mod store;
pub mod traits;

pub use backing::{BackingStore, StoreOptions};
pub use chunk::Chunk;
pub use engine::{KvEngine, WriteBatch};
pub use error::{ChunkError, ChunkResult, EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use rocks::RocksEngine;
pub use store::{KvChunkStore, KvStoreFactory};
pub use traits::{Backpressure, ChunkStore, StoreFactory};
