//! zstor-chunks: the leaf stages of the chunk pipeline
//!
//! # Overview
//! - `hash`: SHA-256 content digests rendered as hex (identifiers and keys)
//! - `compress`: zstd block compression with a declared uncompressed length
//! - `reader`: fixed-size sequential chunk reader over a file
//! - `writer`: sequential writer for decoded chunks

pub mod compress;
pub mod hash;
pub mod reader;
pub mod writer;

pub use compress::{Compressor, DEFAULT_COMPRESSION_LEVEL};
pub use hash::{digest_hex, is_digest_hex, DIGEST_HEX_LEN};
pub use reader::ChunkReader;
pub use writer::ChunkWriter;
