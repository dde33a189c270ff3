//! zstor-sync: drives files through the chunk codec
//!
//! Push: reader → codec encode → store. Pull: store → codec decode → writer.

pub mod engine;

pub use engine::{
    decode_chunks, encode_file, pull_file, push_file, EncodedChunk, ProgressFn, PullResult,
    PushResult,
};
