//! zstd block compression with a declared-length contract
//!
//! Every compressed block is a single zstd frame whose header carries the
//! uncompressed length. `compress` sizes its output with zstd's worst-case
//! bound; `decompress` reads the declared length back out of the frame header,
//! allocates exactly that much, and rejects any frame whose output disagrees.

use tracing::debug;
use zstd::zstd_safe;
use zstor_core::{ZstorError, ZstorResult};

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default ceiling on the uncompressed size a frame may declare (64 MiB)
pub const DEFAULT_MAX_DECLARED_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    level: i32,
    max_declared_size: usize,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Compressor {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            max_declared_size: DEFAULT_MAX_DECLARED_SIZE,
        }
    }

    /// Refuse to allocate more than `max` bytes for a single decompressed block.
    pub fn with_max_declared_size(mut self, max: usize) -> Self {
        self.max_declared_size = max;
        self
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Largest block this compressor will produce or accept.
    pub fn max_declared_size(&self) -> usize {
        self.max_declared_size
    }

    /// Compress `data` into a single zstd frame.
    ///
    /// Blocks larger than the declared-size ceiling are refused, since
    /// `decompress` would reject the frame they produce.
    pub fn compress(&self, data: &[u8]) -> ZstorResult<Vec<u8>> {
        if data.len() > self.max_declared_size {
            return Err(ZstorError::Compression(format!(
                "block of {} bytes exceeds limit {}",
                data.len(),
                self.max_declared_size
            )));
        }

        let bound = zstd_safe::compress_bound(data.len());
        let mut out = vec![0u8; bound];

        let written = zstd::bulk::compress_to_buffer(data, &mut out[..], self.level)
            .map_err(|e| ZstorError::Compression(format!("zstd compress: {e}")))?;
        out.truncate(written);

        debug!(input = data.len(), output = written, level = self.level, "compressed");
        Ok(out)
    }

    /// Decompress a frame produced by [`Compressor::compress`].
    pub fn decompress(&self, data: &[u8]) -> ZstorResult<Vec<u8>> {
        let declared = self.declared_len(data)?;
        let mut out = vec![0u8; declared];

        let written = zstd::bulk::decompress_to_buffer(data, &mut out[..])
            .map_err(|e| ZstorError::CorruptData(format!("zstd decompress: {e}")))?;
        if written != declared {
            return Err(ZstorError::CorruptData(format!(
                "frame declares {declared} bytes but decompressed to {written}"
            )));
        }

        debug!(input = data.len(), output = written, "decompressed");
        Ok(out)
    }

    /// The uncompressed length recorded in the frame header.
    pub fn declared_len(&self, data: &[u8]) -> ZstorResult<usize> {
        let size = match zstd_safe::get_frame_content_size(data) {
            Ok(Some(size)) => size,
            Ok(None) => {
                return Err(ZstorError::CorruptData(
                    "zstd frame does not declare its content size".into(),
                ))
            }
            Err(_) => {
                return Err(ZstorError::CorruptData(
                    "not a valid zstd frame header".into(),
                ))
            }
        };

        usize::try_from(size)
            .ok()
            .filter(|n| *n <= self.max_declared_size)
            .ok_or_else(|| {
                ZstorError::CorruptData(format!(
                    "declared size {size} exceeds limit {}",
                    self.max_declared_size
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trip_small() {
        let c = Compressor::default();
        let data = b"hello world";
        let packed = c.compress(data).unwrap();
        assert_eq!(c.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn declared_length_matches_input() {
        let c = Compressor::default();
        let data = vec![0x5Au8; 300_000];
        let packed = c.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(c.declared_len(&packed).unwrap(), data.len());
    }

    #[test]
    fn empty_input_round_trips() {
        let c = Compressor::default();
        let packed = c.compress(b"").unwrap();
        assert_eq!(c.decompress(&packed).unwrap(), b"");
    }

    #[test]
    fn garbage_is_corrupt() {
        let c = Compressor::default();
        let err = c.decompress(b"definitely not zstd").unwrap_err();
        assert!(matches!(err, ZstorError::CorruptData(_)));
    }

    #[test]
    fn truncated_frame_is_corrupt() {
        let c = Compressor::default();
        let data: Vec<u8> = (0u8..=255).cycle().take(64 * 1024).collect();
        let packed = c.compress(&data).unwrap();
        let err = c.decompress(&packed[..packed.len() / 2]).unwrap_err();
        assert!(matches!(err, ZstorError::CorruptData(_)));
    }

    #[test]
    fn oversized_declaration_is_refused() {
        let data = vec![1u8; 4096];
        let packed = Compressor::default().compress(&data).unwrap();
        let strict = Compressor::default().with_max_declared_size(1024);
        let err = strict.decompress(&packed).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn oversized_block_is_not_compressed() {
        let c = Compressor::default().with_max_declared_size(1024);
        let packed = c.compress(&[7u8; 1024]).unwrap();
        assert_eq!(c.declared_len(&packed).unwrap(), 1024);

        let err = c.compress(&[7u8; 1025]).unwrap_err();
        assert!(matches!(err, ZstorError::Compression(_)));
    }

    proptest! {
        #[test]
        fn compress_decompress_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..=65536),
            level in 1i32..=9,
        ) {
            let c = Compressor::new(level);
            let packed = c.compress(&data).unwrap();
            prop_assert_eq!(c.decompress(&packed).unwrap(), data);
        }

        #[test]
        fn compression_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..=8192)) {
            let c = Compressor::default();
            prop_assert_eq!(c.compress(&data).unwrap(), c.compress(&data).unwrap());
        }
    }
}
