//! The table mutation session and its creation modes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use strata_types::Hash;
use tracing::debug;

use crate::error::{ImportError, ImportResult};
use crate::row::Row;
use crate::traits::{Database, EditBase, RootValue, RowMap, Schema, TableEditor};

/// Row-op interval between stats callback invocations.
///
/// A lower bound: the callback fires at least every this many row writes,
/// never on an exact schedule.
pub const STAT_UPDATE_RATE: u64 = 1 << 16;

/// Row-op interval between mid-session garbage collection passes.
///
/// A lower bound, like [`STAT_UPDATE_RATE`]. Without periodic GC a large
/// load retains every intermediate table version as unreachable history.
pub const GC_RATE: u64 = 1 << 17;

/// Cumulative outcome counts for one mutation session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditStats {
    /// Rows inserted under keys absent from the initial snapshot.
    pub additions: u64,
    /// Rows written over existing keys with differing field values.
    pub modifications: u64,
    /// Rows identical to the initial snapshot, skipped entirely.
    pub same_value: u64,
}

/// Periodic stats observer for a mutation session.
pub type StatsCallback = Box<dyn FnMut(EditStats) + Send>;

/// Names one table and constructs [`TableWriter`]s against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableTarget {
    name: String,
}

impl TableTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The table name this target refers to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the table exists under the given root.
    pub fn exists(&self, root: &dyn RootValue) -> ImportResult<bool> {
        root.has_table(&self.name)
    }

    /// Writer for a brand-new table: insert-only over an empty snapshot.
    ///
    /// Registers the table (name and schema) under the root before opening
    /// the editor, so the table exists as soon as the writer does. Fails
    /// with [`ImportError::NoPrimaryKey`] if the schema has no primary-key
    /// columns.
    pub fn create_writer(
        &self,
        db: Arc<dyn Database>,
        root: &dyn RootValue,
        schema: Arc<dyn Schema>,
        stats_cb: Option<StatsCallback>,
    ) -> ImportResult<TableWriter> {
        if schema.pk_column_count() == 0 {
            return Err(ImportError::NoPrimaryKey);
        }
        root.create_table(&self.name, &schema)?;
        let editor = root.edit_table(&self.name, &schema, EditBase::Empty)?;
        Ok(TableWriter::new(
            db,
            schema,
            editor,
            root.empty_rows(),
            true,
            stats_cb,
        ))
    }

    /// Writer over an existing table's current rows: upsert with dedup
    /// against the snapshot taken here.
    pub fn update_writer(
        &self,
        db: Arc<dyn Database>,
        root: &dyn RootValue,
        stats_cb: Option<StatsCallback>,
    ) -> ImportResult<TableWriter> {
        let schema = root
            .table_schema(&self.name)?
            .ok_or_else(|| ImportError::TableNotFound(self.name.clone()))?;
        let initial = root
            .table_rows(&self.name)?
            .ok_or_else(|| ImportError::TableNotFound(self.name.clone()))?;
        let editor = root.edit_table(&self.name, &schema, EditBase::Current)?;
        Ok(TableWriter::new(db, schema, editor, initial, false, stats_cb))
    }

    /// Writer that discards an existing table's rows but keeps its schema:
    /// insert-only over an empty snapshot.
    pub fn replace_writer(
        &self,
        db: Arc<dyn Database>,
        root: &dyn RootValue,
        stats_cb: Option<StatsCallback>,
    ) -> ImportResult<TableWriter> {
        let schema = root
            .table_schema(&self.name)?
            .ok_or_else(|| ImportError::TableNotFound(self.name.clone()))?;
        let editor = root.edit_table(&self.name, &schema, EditBase::Empty)?;
        Ok(TableWriter::new(
            db,
            schema,
            editor,
            root.empty_rows(),
            true,
            stats_cb,
        ))
    }
}

/// One table mutation session.
///
/// Insert-only writers (create / replace modes) push every row straight to
/// the editor. Upsert writers (update mode) dedup each row against the
/// snapshot taken when the writer was constructed, so two writes of the
/// same key in one session both compare against the pre-session value and
/// the last one wins at flush.
pub struct TableWriter {
    db: Arc<dyn Database>,
    schema: Arc<dyn Schema>,
    editor: Box<dyn TableEditor>,
    initial: Arc<dyn RowMap>,
    insert_only: bool,
    stats_cb: Option<StatsCallback>,
    stats: EditStats,
    stat_ops: AtomicU64,
    gc_ops: AtomicU64,
}

impl TableWriter {
    fn new(
        db: Arc<dyn Database>,
        schema: Arc<dyn Schema>,
        editor: Box<dyn TableEditor>,
        initial: Arc<dyn RowMap>,
        insert_only: bool,
        stats_cb: Option<StatsCallback>,
    ) -> Self {
        Self {
            db,
            schema,
            editor,
            initial,
            insert_only,
            stats_cb,
            stats: EditStats::default(),
            stat_ops: AtomicU64::new(0),
            gc_ops: AtomicU64::new(0),
        }
    }

    /// The schema this session writes under.
    pub fn schema(&self) -> &Arc<dyn Schema> {
        &self.schema
    }

    /// Cumulative session statistics so far.
    pub fn stats(&self) -> EditStats {
        self.stats
    }

    /// Record one incoming row.
    ///
    /// Fires the stats callback and runs mid-session GC at their respective
    /// cadences before touching the editor.
    pub fn write_row(&mut self, row: Row) -> ImportResult<()> {
        if self.stats_cb.is_some() && self.stat_ops.load(Ordering::Relaxed) >= STAT_UPDATE_RATE {
            self.stat_ops.store(0, Ordering::Relaxed);
            if let Some(cb) = self.stats_cb.as_mut() {
                cb(self.stats);
            }
        }

        if self.gc_ops.load(Ordering::Relaxed) >= GC_RATE {
            self.gc_ops.store(0, Ordering::Relaxed);
            self.collect_garbage()?;
        }
        self.gc_ops.fetch_add(1, Ordering::Relaxed);

        if self.insert_only {
            let key = self.schema.primary_key(&row)?;
            let value = self.schema.encode_row(&row)?;
            self.stat_ops.fetch_add(1, Ordering::Relaxed);
            self.stats.additions += 1;
            return self.editor.insert(key, value);
        }

        let key = self.schema.primary_key(&row)?;
        match self.initial.get(&key)? {
            None => {
                let value = self.schema.encode_row(&row)?;
                self.stat_ops.fetch_add(1, Ordering::Relaxed);
                self.stats.additions += 1;
                self.editor.insert(key, value)
            }
            Some(stored) => {
                let existing = self.schema.decode_row(&key, &stored)?;
                if self.schema.rows_equal(&existing, &row) {
                    self.stats.same_value += 1;
                    return Ok(());
                }
                let value = self.schema.encode_row(&row)?;
                self.stat_ops.fetch_add(1, Ordering::Relaxed);
                self.stats.modifications += 1;
                self.editor.update(key, value)
            }
        }
    }

    /// Materialize all pending edits into a new table root.
    pub fn flush(&mut self) -> ImportResult<Hash> {
        self.editor.flush()
    }

    /// Persist the in-progress state and reclaim chunks unreachable from
    /// the working, staged, and in-progress roots.
    fn collect_garbage(&mut self) -> ImportResult<()> {
        let working = self.db.working_root();
        let staged = self.db.staged_root();
        let flushed = self.editor.flush()?;
        let in_progress = self.db.write_root_value(flushed)?;
        debug!(
            working = %working,
            staged = %staged,
            in_progress = %in_progress,
            "collecting garbage mid-session"
        );
        self.db.collect_garbage(working, staged, in_progress)
    }

    /// End the session: run a final GC pass, then deliver final stats to
    /// the callback whether or not GC succeeded.
    pub fn close(mut self) -> ImportResult<()> {
        let result = self.collect_garbage();
        if let Some(cb) = self.stats_cb.as_mut() {
            cb(self.stats);
        }
        result
    }
}

impl fmt::Debug for TableWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableWriter")
            .field("insert_only", &self.insert_only)
            .field("stats", &self.stats)
            .field("stat_ops", &self.stat_ops.load(Ordering::Relaxed))
            .field("gc_ops", &self.gc_ops.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
