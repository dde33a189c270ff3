use std::path::PathBuf;
use thiserror::Error;

pub type ZstorResult<T> = Result<T, ZstorError>;

#[derive(Debug, Error)]
pub enum ZstorError {
    #[error("file error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zero-length source. Advisory: the caller decides whether to skip.
    #[error("input is empty, nothing to do")]
    EmptyInput,

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("compression error: {0}")]
    Compression(String),

    #[error("corrupt data: {0}")]
    CorruptData(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("integrity check failed: hash mismatch ({actual} <> {expected})")]
    Integrity { expected: String, actual: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("remote storage is disabled")]
    RemoteDisabled,

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("chunk {index}: {source}")]
    Chunk {
        index: u64,
        #[source]
        source: Box<ZstorError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZstorError {
    /// Attach a file path to an I/O failure.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ZstorError::File {
            path: path.into(),
            source,
        }
    }

    /// Tag an error with the index of the chunk that produced it.
    pub fn in_chunk(self, index: u64) -> Self {
        ZstorError::Chunk {
            index,
            source: Box::new(self),
        }
    }

    /// True for conditions that are reported but not fatal (empty input).
    pub fn is_advisory(&self) -> bool {
        matches!(self.root(), ZstorError::EmptyInput)
    }

    /// The innermost error, looking through `Chunk` wrappers.
    pub fn root(&self) -> &ZstorError {
        match self {
            ZstorError::Chunk { source, .. } => source.root(),
            other => other,
        }
    }
}
