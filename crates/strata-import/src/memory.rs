//! In-memory collaborator implementations for tests and embedding.
//!
//! These stand in for the versioned database above this crate:
//! [`MemoryRowMap`] is a frozen snapshot, [`MemoryTableEditor`] accumulates
//! pending edits over a base map, [`MemoryDatabase`] records every root
//! persisted and every GC request it receives, and [`MemoryRootValue`]
//! holds named tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use strata_types::Hash;

use crate::error::{ImportError, ImportResult};
use crate::traits::{Database, EditBase, RootValue, RowMap, Schema, TableEditor};

/// A frozen `BTreeMap` snapshot implementing [`RowMap`].
#[derive(Clone, Debug, Default)]
pub struct MemoryRowMap {
    rows: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryRowMap {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the given rows.
    pub fn from_rows(rows: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self { rows }
    }
}

impl RowMap for MemoryRowMap {
    fn get(&self, key: &[u8]) -> ImportResult<Option<Vec<u8>>> {
        Ok(self.rows.get(key).cloned())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Shared, inspectable materialized state of a [`MemoryTableEditor`].
pub type EditorState = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Pending-edit accumulator over a base map.
///
/// `flush` folds pending edits into the shared state and hashes the
/// resulting map into a root value. Keep a clone of [`state`] around to
/// inspect the materialized rows after the writer takes ownership.
///
/// [`state`]: MemoryTableEditor::state
#[derive(Debug)]
pub struct MemoryTableEditor {
    state: EditorState,
    pending: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryTableEditor {
    /// Editor over the given base rows.
    pub fn new(base: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self {
            state: Arc::new(RwLock::new(base)),
            pending: BTreeMap::new(),
        }
    }

    /// Handle to the materialized state (updated on every flush).
    pub fn state(&self) -> EditorState {
        Arc::clone(&self.state)
    }

    /// Number of edits not yet flushed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for MemoryTableEditor {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl TableEditor for MemoryTableEditor {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> ImportResult<()> {
        self.pending.insert(key, value);
        Ok(())
    }

    fn update(&mut self, key: Vec<u8>, value: Vec<u8>) -> ImportResult<()> {
        self.pending.insert(key, value);
        Ok(())
    }

    fn flush(&mut self) -> ImportResult<Hash> {
        let mut state = self.state.write().expect("editor state poisoned");
        state.append(&mut self.pending);
        let encoded =
            bincode::serialize(&*state).map_err(|e| ImportError::Storage(e.to_string()))?;
        Ok(Hash::of(&encoded))
    }
}

/// Recorded anchors of one GC request: working, staged, in-progress.
pub type GcCall = [Hash; 3];

/// Recording [`Database`] double.
///
/// Working and staged anchors are configurable; every persisted root and
/// every GC call is recorded for inspection.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    working: RwLock<Hash>,
    staged: RwLock<Hash>,
    persisted: RwLock<Vec<Hash>>,
    gc_calls: RwLock<Vec<GcCall>>,
}

impl MemoryDatabase {
    /// Database with zero working/staged anchors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working anchor returned by [`Database::working_root`].
    pub fn set_working_root(&self, root: Hash) {
        *self.working.write().expect("lock poisoned") = root;
    }

    /// Set the staged anchor returned by [`Database::staged_root`].
    pub fn set_staged_root(&self, root: Hash) {
        *self.staged.write().expect("lock poisoned") = root;
    }

    /// Every root handed to [`Database::write_root_value`], in order.
    pub fn persisted_roots(&self) -> Vec<Hash> {
        self.persisted.read().expect("lock poisoned").clone()
    }

    /// Every GC request received, in order.
    pub fn gc_calls(&self) -> Vec<GcCall> {
        self.gc_calls.read().expect("lock poisoned").clone()
    }
}

impl Database for MemoryDatabase {
    fn working_root(&self) -> Hash {
        *self.working.read().expect("lock poisoned")
    }

    fn staged_root(&self) -> Hash {
        *self.staged.read().expect("lock poisoned")
    }

    fn write_root_value(&self, root: Hash) -> ImportResult<Hash> {
        self.persisted.write().expect("lock poisoned").push(root);
        Ok(root)
    }

    fn collect_garbage(
        &self,
        working: Hash,
        staged: Hash,
        in_progress: Hash,
    ) -> ImportResult<()> {
        self.gc_calls
            .write()
            .expect("lock poisoned")
            .push([working, staged, in_progress]);
        Ok(())
    }
}

struct MemoryTable {
    schema: Arc<dyn Schema>,
    rows: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// A [`RootValue`] holding named tables in memory.
#[derive(Default)]
pub struct MemoryRootValue {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryRootValue {
    /// An empty root value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with its schema and current rows.
    pub fn put_table(
        &self,
        name: impl Into<String>,
        schema: Arc<dyn Schema>,
        rows: BTreeMap<Vec<u8>, Vec<u8>>,
    ) {
        self.tables
            .write()
            .expect("lock poisoned")
            .insert(name.into(), MemoryTable { schema, rows });
    }
}

impl RootValue for MemoryRootValue {
    fn has_table(&self, name: &str) -> ImportResult<bool> {
        Ok(self.tables.read().expect("lock poisoned").contains_key(name))
    }

    fn create_table(&self, name: &str, schema: &Arc<dyn Schema>) -> ImportResult<()> {
        self.tables.write().expect("lock poisoned").insert(
            name.to_string(),
            MemoryTable {
                schema: Arc::clone(schema),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn table_schema(&self, name: &str) -> ImportResult<Option<Arc<dyn Schema>>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.get(name).map(|t| Arc::clone(&t.schema)))
    }

    fn table_rows(&self, name: &str) -> ImportResult<Option<Arc<dyn RowMap>>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.get(name).map(|t| {
            Arc::new(MemoryRowMap::from_rows(t.rows.clone())) as Arc<dyn RowMap>
        }))
    }

    fn empty_rows(&self) -> Arc<dyn RowMap> {
        Arc::new(MemoryRowMap::new())
    }

    fn edit_table(
        &self,
        name: &str,
        _schema: &Arc<dyn Schema>,
        base: EditBase,
    ) -> ImportResult<Box<dyn TableEditor>> {
        let tables = self.tables.read().expect("lock poisoned");
        let rows = match base {
            EditBase::Empty => BTreeMap::new(),
            EditBase::Current => tables
                .get(name)
                .map(|t| t.rows.clone())
                .ok_or_else(|| ImportError::TableNotFound(name.to_string()))?,
        };
        Ok(Box::new(MemoryTableEditor::new(rows)))
    }
}
