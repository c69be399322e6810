//! The backing engine adapter.
//!
//! [`KvEngine`] is the seam between the chunk store and the embedded ordered
//! key-value engine underneath it. The engine is consumed as a capability
//! (point reads, membership probes, single puts, atomic batches); its own
//! log and compaction machinery is not this crate's business.

use crate::error::EngineResult;

/// Adapter over one embedded ordered key-value engine instance.
///
/// Implementations must satisfy:
/// - A single-key `put` with `sync = true` is durable once it returns
///   (flushed to stable storage) and crash-atomic.
/// - `write_batch` applies all entries or none of them.
/// - `has` must not pollute the engine's read cache; it is a membership
///   probe, not a read that will be followed by a value fetch.
pub trait KvEngine: Send + Sync {
    /// Read the value at `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Cache-bypassing membership probe.
    fn has(&self, key: &[u8]) -> EngineResult<bool>;

    /// Write one key. `sync` forces a durable flush before returning.
    fn put(&self, key: &[u8], value: &[u8], sync: bool) -> EngineResult<()>;

    /// Apply a multi-key batch atomically: all entries visible or none.
    fn write_batch(&self, batch: WriteBatch) -> EngineResult<()>;

    /// Flush and release whatever can be released ahead of drop.
    fn close(&self) -> EngineResult<()>;
}

/// An atomic multi-key write, accumulated by the caller and handed to
/// [`KvEngine::write_batch`] as a single unit.
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    payload_bytes: u64,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a put to the batch.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.payload_bytes += value.len() as u64;
        self.entries.push((key, value));
    }

    /// Number of entries in the batch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the batch has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total value bytes across all entries.
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// The accumulated entries, in insertion order.
    pub fn entries(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_accumulates_entries_in_order() {
        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"22".to_vec());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.entries()[0].0, b"a");
        assert_eq!(batch.entries()[1].0, b"b");
    }

    #[test]
    fn batch_tracks_payload_bytes() {
        let mut batch = WriteBatch::new();
        batch.put(b"k1".to_vec(), vec![0u8; 10]);
        batch.put(b"k2".to_vec(), vec![0u8; 5]);
        assert_eq!(batch.payload_bytes(), 15);
    }

    #[test]
    fn empty_batch() {
        let batch = WriteBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.payload_bytes(), 0);
    }
}
