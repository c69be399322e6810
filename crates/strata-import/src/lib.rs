//! Table mutation sessions for Strata.
//!
//! A [`TableWriter`] converts a stream of incoming rows into persisted-map
//! mutations against one table version: inserts and updates are
//! deduplicated against the session's initial snapshot, cumulative
//! statistics are reported at a fixed cadence, and garbage collection runs
//! periodically mid-import so a large load does not retain every
//! intermediate version of the table as unreachable history.
//!
//! The versioned object graph itself lives above this crate and is consumed
//! through traits: [`Database`] (anchor roots, root persistence, GC),
//! [`RootValue`] (table lookup), [`RowMap`] (the initial snapshot),
//! [`TableEditor`] (pending-edit accumulation), and [`Schema`] (primary-key
//! extraction and the row codec).
//!
//! # Key Types
//!
//! - [`TableWriter`] — the mutation session (insert-only or upsert)
//! - [`TableTarget`] — names a table and constructs writers in its three
//!   creation modes (create / update / replace)
//! - [`Row`] / [`RowValue`] — positional row model
//! - [`TupleCodec`] — bincode tuple codec implementing [`Schema`]
//! - [`EditStats`] — cumulative additions / modifications / same-value
//!   counts
//! - In-memory collaborators ([`MemoryDatabase`], [`MemoryRowMap`],
//!   [`MemoryTableEditor`], [`MemoryRootValue`]) for tests and embedding

pub mod codec;
pub mod error;
pub mod memory;
pub mod row;
pub mod traits;
pub mod writer;

pub use codec::TupleCodec;
pub use error::{ImportError, ImportResult};
pub use memory::{MemoryDatabase, MemoryRootValue, MemoryRowMap, MemoryTableEditor};
pub use row::{Row, RowValue};
pub use traits::{Database, EditBase, RootValue, RowMap, Schema, TableEditor};
pub use writer::{EditStats, StatsCallback, TableTarget, TableWriter, GC_RATE, STAT_UPDATE_RATE};
