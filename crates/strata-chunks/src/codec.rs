//! Blob codec applied to chunk payloads before they reach the engine.
//!
//! Chunks are compressed with Snappy (raw format) on the way in and
//! decompressed on the way out. The engine's own block compression is
//! disabled; small content-addressed blobs want a fast codec over a dense
//! one.

use crate::error::{ChunkError, ChunkResult};

/// Compress a chunk payload.
pub fn compress(data: &[u8]) -> ChunkResult<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(data)
        .map_err(|e| ChunkError::Codec(e.to_string()))
}

/// Decompress a stored chunk payload.
///
/// Failure here means the stored bytes are corrupt, which is fatal.
pub fn decompress(data: &[u8]) -> ChunkResult<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(|e| ChunkError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = compress(&data).unwrap();
        let restored = decompress(&compressed).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn empty_roundtrip() {
        let compressed = compress(b"").unwrap();
        assert_eq!(decompress(&compressed).unwrap(), b"");
    }

    #[test]
    fn repetitive_data_shrinks() {
        let data = vec![7u8; 4096];
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len());
    }

    #[test]
    fn garbage_fails_to_decompress() {
        let err = decompress(&[0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ChunkError::Codec(_)));
    }
}
