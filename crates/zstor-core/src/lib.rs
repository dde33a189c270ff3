pub mod config;
pub mod error;
pub mod types;

pub use config::ZstorConfig;
pub use error::{ZstorError, ZstorResult};
pub use types::{Chunk, ChunkRef};

/// Nominal chunk size used when nothing else is configured (512 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;
