//! Collaborator interfaces consumed by the mutation session.
//!
//! The versioned-tree model, schema encoding, and persistent map all live
//! above this crate; the session touches them only through these traits.

use std::sync::Arc;

use strata_types::Hash;

use crate::error::ImportResult;
use crate::row::Row;

/// Primary-key extraction and the row codec for one table schema.
pub trait Schema: Send + Sync {
    /// Number of primary-key columns. Zero means the table cannot be
    /// written in create mode.
    fn pk_column_count(&self) -> usize;

    /// Encode the row's primary key into the persistent map's key form.
    fn primary_key(&self, row: &Row) -> ImportResult<Vec<u8>>;

    /// Encode the row's non-key fields into the persistent map's value
    /// form.
    fn encode_row(&self, row: &Row) -> ImportResult<Vec<u8>>;

    /// Reconstruct a full row from its stored key/value encoding.
    fn decode_row(&self, key: &[u8], value: &[u8]) -> ImportResult<Row>;

    /// Field-by-field equality of two rows under this schema.
    fn rows_equal(&self, a: &Row, b: &Row) -> bool;
}

/// Point-in-time snapshot of a table's persistent ordered map.
///
/// The session uses this for dedup lookups against the state at session
/// start; it never reflects edits made during the session.
pub trait RowMap: Send + Sync {
    /// The stored value for a primary-key encoding, or `None` if absent.
    fn get(&self, key: &[u8]) -> ImportResult<Option<Vec<u8>>>;

    /// Number of rows in the snapshot.
    fn len(&self) -> usize;

    /// Returns `true` if the snapshot has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulates pending row edits and materializes them on flush.
pub trait TableEditor: Send {
    /// Record an insert for a key absent from the base map.
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> ImportResult<()>;

    /// Record an update for a key present in the base map.
    fn update(&mut self, key: Vec<u8>, value: Vec<u8>) -> ImportResult<()>;

    /// Materialize all pending edits into a new persistent root value and
    /// return its hash. Callable multiple times.
    fn flush(&mut self) -> ImportResult<Hash>;
}

/// The enclosing versioned database, as seen by a mutation session.
pub trait Database: Send + Sync {
    /// The working root hash: one of the two anchors that must survive a
    /// GC pass.
    fn working_root(&self) -> Hash;

    /// The staged root hash: the other GC anchor.
    fn staged_root(&self) -> Hash;

    /// Persist an in-progress root value, returning its handle.
    fn write_root_value(&self, root: Hash) -> ImportResult<Hash>;

    /// Reclaim every chunk unreachable from the three given roots.
    fn collect_garbage(
        &self,
        working: Hash,
        staged: Hash,
        in_progress: Hash,
    ) -> ImportResult<()>;
}

/// Which map state a newly created editor starts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditBase {
    /// Edit on top of the table's current rows (update mode).
    Current,
    /// Edit on top of an empty map (create and replace modes).
    Empty,
}

/// Table lookup surface of one root value, used when constructing writers.
pub trait RootValue: Send + Sync {
    /// Returns `true` if the named table exists under this root.
    fn has_table(&self, name: &str) -> ImportResult<bool>;

    /// Register a new table (name and schema, no rows) under this root,
    /// replacing any existing registration. After this returns,
    /// [`has_table`](RootValue::has_table) is `true` for `name`.
    fn create_table(&self, name: &str, schema: &Arc<dyn Schema>) -> ImportResult<()>;

    /// The named table's schema, or `None` if the table is absent.
    fn table_schema(&self, name: &str) -> ImportResult<Option<Arc<dyn Schema>>>;

    /// Snapshot of the named table's rows, or `None` if the table is
    /// absent.
    fn table_rows(&self, name: &str) -> ImportResult<Option<Arc<dyn RowMap>>>;

    /// An empty row snapshot (create and replace modes start from this).
    fn empty_rows(&self) -> Arc<dyn RowMap>;

    /// Open an editor for the named table, starting from `base`.
    fn edit_table(
        &self,
        name: &str,
        schema: &Arc<dyn Schema>,
        base: EditBase,
    ) -> ImportResult<Box<dyn TableEditor>>;
}
