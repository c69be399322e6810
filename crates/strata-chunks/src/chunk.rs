use strata_types::Hash;

/// An immutable content-addressed byte blob.
///
/// The hash is the BLAKE3 digest of the data. [`Chunk::with_hash`] is a
/// trust boundary: the store never verifies the hash on write, so a caller
/// must never pair a blob with anything but its true digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    hash: Hash,
    data: Vec<u8>,
}

impl Chunk {
    /// Create a chunk, computing its hash from the data.
    pub fn new(data: Vec<u8>) -> Self {
        let hash = Hash::of(&data);
        Self { hash, data }
    }

    /// Create a chunk from a pre-computed hash and its data.
    pub fn with_hash(hash: Hash, data: Vec<u8>) -> Self {
        Self { hash, data }
    }

    /// The empty-chunk sentinel returned when a requested chunk is absent.
    pub fn empty() -> Self {
        Self {
            hash: Hash::zero(),
            data: Vec::new(),
        }
    }

    /// Returns `true` if this is the empty sentinel (no data).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The content hash this chunk is stored under.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The chunk's raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the chunk, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Size of the chunk's data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
