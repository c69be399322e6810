//! RocksDB implementation of the backing engine adapter.

use std::path::Path;

use rocksdb::{BlockBasedOptions, DBCompressionType, Options, ReadOptions, WriteOptions, DB};

use crate::engine::{KvEngine, WriteBatch};
use crate::error::{EngineError, EngineResult};

/// Write buffer size for batching small writes before they hit disk.
const WRITE_BUFFER_BYTES: usize = 16 * 1024 * 1024;

/// Bloom filter sizing; cuts disk reads on misses.
const BLOOM_BITS_PER_KEY: f64 = 10.0;

impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        EngineError::Backend(e.to_string())
    }
}

/// [`KvEngine`] over a RocksDB instance.
///
/// Block compression is disabled: chunk payloads are already compressed by
/// the blob codec before they reach the engine.
pub struct RocksEngine {
    db: DB,
}

impl RocksEngine {
    /// Open (creating if absent) a RocksDB instance at `dir`.
    ///
    /// `max_file_handles` caps the engine's open-file cache.
    pub fn open(dir: &Path, max_file_handles: usize) -> EngineResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(DBCompressionType::None);
        opts.set_max_open_files(max_file_handles as i32);
        opts.set_write_buffer_size(WRITE_BUFFER_BYTES);

        let mut block = BlockBasedOptions::default();
        block.set_bloom_filter(BLOOM_BITS_PER_KEY, false);
        opts.set_block_based_table_factory(&block);

        let db = DB::open(&opts, dir)?;
        Ok(Self { db })
    }
}

impl KvEngine for RocksEngine {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn has(&self, key: &[u8]) -> EngineResult<bool> {
        // Not a real read: skip the block cache so probes do not evict
        // data that will actually be fetched.
        let mut ro = ReadOptions::default();
        ro.fill_cache(false);
        Ok(self.db.get_pinned_opt(key, &ro)?.is_some())
    }

    fn put(&self, key: &[u8], value: &[u8], sync: bool) -> EngineResult<()> {
        if sync {
            let mut wo = WriteOptions::default();
            wo.set_sync(true);
            self.db.put_opt(key, value, &wo)?;
        } else {
            self.db.put(key, value)?;
        }
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> EngineResult<()> {
        let mut wb = rocksdb::WriteBatch::default();
        for (key, value) in batch.entries() {
            wb.put(key, value);
        }
        Ok(self.db.write(wb)?)
    }

    fn close(&self) -> EngineResult<()> {
        self.db.flush()?;
        self.db.cancel_all_background_work(true);
        Ok(())
    }
}
