use serde::{Deserialize, Serialize};

/// An encapsulated chunk: storage identifier, decryption key, and frame bytes.
///
/// `id` is the hex digest of the ciphertext and `key` the hex digest of the
/// original plaintext. Both are pure functions of the plaintext, so encoding
/// the same bytes twice yields an identical `Chunk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub key: String,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(id: String, key: String, data: Vec<u8>) -> Self {
        Self { id, key, data }
    }

    /// Length of the frame in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reference to a stored chunk, as reported by push and consumed by pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub index: u64,
    pub id: String,
    pub key: String,
    /// Plaintext length
    pub size: u64,
    /// Encapsulated frame length
    pub frame_size: u64,
}

impl ChunkRef {
    pub fn from_chunk(index: u64, size: u64, chunk: &Chunk) -> Self {
        Self {
            index,
            id: chunk.id.clone(),
            key: chunk.key.clone(),
            size,
            frame_size: chunk.len() as u64,
        }
    }
}
