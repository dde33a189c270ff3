//! SHA-256 content hashing
//!
//! The same digest serves two roles in the pipeline: the digest of the
//! plaintext is the chunk's encryption key, and the digest of the ciphertext
//! is its storage identifier.

use sha2::{Digest, Sha256};

/// Length of a hex-rendered digest (32 bytes → 64 chars)
pub const DIGEST_HEX_LEN: usize = 64;

/// Hash a byte slice and format it as lowercase hex (64 chars)
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// True if `s` looks like a value produced by [`digest_hex`]
pub fn is_digest_hex(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
