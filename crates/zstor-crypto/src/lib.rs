//! zstor-crypto: convergent chunk encapsulation
//!
//! Pipeline: plaintext → SHA-256 (key) → zstd compress → AES-SIV encrypt
//! → SHA-256 (identifier) → CRC32 frame
//!
//! ```text
//! key   = hex(SHA-256(plaintext))
//! ct    = AES-256-SIV(key = HKDF-SHA256(key), nonce = 0, zstd(plaintext))
//! id    = hex(SHA-256(ct))
//! frame = "10000000" || hex8(CRC32(ct)) || ct
//! ```
//!
//! Because the key is derived from the plaintext and the cipher is
//! deterministic, identical chunks always produce identical frames and
//! identifiers. Anyone comparing identifiers learns which chunks are equal.

pub mod cipher;
pub mod codec;
pub mod frame;

pub use cipher::{decrypt_chunk, encrypt_chunk};
pub use codec::{ChunkCodec, CodecOptions};
pub use frame::{Frame, FORMAT_TAG, PREAMBLE_LEN};

/// Size of the AES-256-SIV key (two 32-byte sub-keys)
pub const SIV_KEY_SIZE: usize = 64;

/// Size of the synthetic IV prepended to every ciphertext
pub const SIV_TAG_SIZE: usize = 16;
