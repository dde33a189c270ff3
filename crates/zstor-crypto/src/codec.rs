//! Chunk encode/decode protocol
//!
//! Encode derives the key from the original (uncompressed) bytes so that
//! decode can recompute it from the recovered plaintext; that recomputation is
//! the integrity check.

use tracing::debug;
use zstor_chunks::{digest_hex, Compressor};
use zstor_core::config::CodecConfig;
use zstor_core::{Chunk, ZstorError, ZstorResult};

use crate::cipher::{decrypt_chunk, encrypt_chunk};
use crate::frame::{self, Frame};

#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    pub compression_level: i32,
    /// Check the frame CRC32 before decrypting
    pub verify_checksum: bool,
    /// Largest uncompressed size a frame may declare
    pub max_chunk_size: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions::from(&CodecConfig::default())
    }
}

impl From<&CodecConfig> for CodecOptions {
    fn from(cfg: &CodecConfig) -> Self {
        Self {
            compression_level: cfg.compression_level,
            verify_checksum: cfg.verify_checksum,
            max_chunk_size: cfg.max_chunk_size,
        }
    }
}

/// Stateless chunk codec; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct ChunkCodec {
    compressor: Compressor,
    verify_checksum: bool,
}

impl ChunkCodec {
    pub fn new(opts: CodecOptions) -> Self {
        Self {
            compressor: Compressor::new(opts.compression_level)
                .with_max_declared_size(opts.max_chunk_size),
            verify_checksum: opts.verify_checksum,
        }
    }

    /// Compress, encrypt, and frame one plaintext chunk.
    pub fn encode(&self, plain: &[u8]) -> ZstorResult<Chunk> {
        let key = digest_hex(plain);
        debug!(key = %key, bytes = plain.len(), "chunk hash");

        let compressed = self.compressor.compress(plain)?;
        let ciphertext = encrypt_chunk(&compressed, &key)?;

        let id = digest_hex(&ciphertext);
        debug!(id = %id, bytes = ciphertext.len(), "encrypted hash");

        Ok(Chunk::new(id, key, frame::build(&ciphertext)))
    }

    /// Recover the plaintext of `chunk`, verifying it against `chunk.key`.
    pub fn decode(&self, chunk: &Chunk) -> ZstorResult<Vec<u8>> {
        self.decode_frame(&chunk.data, &chunk.key)
    }

    /// Recover the plaintext of a raw frame given its key.
    pub fn decode_frame(&self, frame: &[u8], key: &str) -> ZstorResult<Vec<u8>> {
        let frame = Frame::parse(frame)?;
        if self.verify_checksum {
            frame.verify_checksum()?;
        }

        let compressed = decrypt_chunk(frame.ciphertext(), key)?;
        let plain = self.compressor.decompress(&compressed)?;

        let integrity = digest_hex(&plain);
        if integrity != key {
            debug!(computed = %integrity, expected = %key, "integrity check failed");
            return Err(ZstorError::Integrity {
                expected: key.to_string(),
                actual: integrity,
            });
        }

        Ok(plain)
    }
}
