//! Deterministic AES-256-SIV chunk encryption
//!
//! Encrypted chunk format (binary):
//! ```text
//! [16 bytes: synthetic IV][N bytes: ciphertext]
//! ```
//!
//! The key is an opaque string (in practice the hex digest of the chunk's
//! plaintext). It is expanded to the 64-byte AES-SIV key with HKDF-SHA256 and
//! used with an all-zero nonce, so the same plaintext and key always produce
//! the same ciphertext. A wrong key and a corrupted payload are
//! indistinguishable: both fail authentication.

use aes_siv::{
    aead::{Aead, KeyInit},
    Aes256SivAead, Nonce,
};
use zeroize::Zeroizing;
use zstor_core::{ZstorError, ZstorResult};

use crate::{SIV_KEY_SIZE, SIV_TAG_SIZE};

const KEY_INFO: &[u8] = b"zstor-chunk-aes-siv";

/// Encrypt a (compressed) chunk under `key`.
///
/// Returns `[16-byte SIV][ciphertext]`.
pub fn encrypt_chunk(plaintext: &[u8], key: &str) -> ZstorResult<Vec<u8>> {
    let cipher = build_cipher(key).map_err(ZstorError::Encryption)?;

    cipher
        .encrypt(&Nonce::default(), plaintext)
        .map_err(|e| ZstorError::Encryption(format!("chunk encryption failed: {e}")))
}

/// Decrypt a chunk produced by [`encrypt_chunk`].
pub fn decrypt_chunk(ciphertext: &[u8], key: &str) -> ZstorResult<Vec<u8>> {
    if ciphertext.len() < SIV_TAG_SIZE {
        return Err(ZstorError::Decryption(format!(
            "encrypted chunk too short: {} bytes (minimum {SIV_TAG_SIZE})",
            ciphertext.len()
        )));
    }

    let cipher = build_cipher(key).map_err(ZstorError::Decryption)?;

    cipher
        .decrypt(&Nonce::default(), ciphertext)
        .map_err(|_| ZstorError::Decryption("cannot decrypt data, invalid key or payload".into()))
}

fn build_cipher(key: &str) -> Result<Aes256SivAead, String> {
    if key.is_empty() {
        return Err("empty chunk key".into());
    }

    let mut siv_key = Zeroizing::new([0u8; SIV_KEY_SIZE]);
    let hkdf = hkdf::Hkdf::<sha2::Sha256>::new(None, key.as_bytes());
    hkdf.expand(KEY_INFO, &mut siv_key[..])
        .map_err(|e| format!("HKDF expand for AES-SIV: {e}"))?;

    Ok(Aes256SivAead::new((&*siv_key).into()))
}
