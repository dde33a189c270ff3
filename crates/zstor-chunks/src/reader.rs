//! Fixed-size sequential chunk reader
//!
//! A source of length `L` read with nominal chunk size `C` yields
//! `ceil(L / C)` chunks: every chunk is `C` bytes except the last, which holds
//! the remainder. A source shorter than `C` yields exactly one chunk.
//!
//! The reader owns one scratch buffer that is reused for every chunk, so the
//! slice returned by [`ChunkReader::next_chunk`] borrows the reader and must
//! be consumed before the next call.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;
use zstor_core::{ZstorError, ZstorResult, DEFAULT_CHUNK_SIZE};

#[derive(Debug)]
pub struct ChunkReader<R = File> {
    inner: R,
    path: Option<PathBuf>,
    len: u64,
    chunk_size: usize,
    chunk_count: u64,
    offset: u64,
    produced: u64,
    scratch: Vec<u8>,
}

impl ChunkReader<File> {
    /// Open `path` with the default 512 KiB chunk size.
    pub fn open(path: &Path) -> ZstorResult<Self> {
        Self::open_with_chunk_size(path, DEFAULT_CHUNK_SIZE)
    }

    /// Open `path` for chunked reading.
    ///
    /// Fails with `File` if the path cannot be opened and with `EmptyInput`
    /// if it has zero length.
    pub fn open_with_chunk_size(path: &Path, chunk_size: usize) -> ZstorResult<Self> {
        let file = File::open(path).map_err(|e| ZstorError::file(path, e))?;
        Self::build(file, Some(path.to_path_buf()), chunk_size)
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Wrap an already-open source.
    pub fn from_reader(inner: R, chunk_size: usize) -> ZstorResult<Self> {
        Self::build(inner, None, chunk_size)
    }

    fn build(mut inner: R, path: Option<PathBuf>, chunk_size: usize) -> ZstorResult<Self> {
        if chunk_size == 0 {
            return Err(ZstorError::Config("chunk size must be > 0".into()));
        }

        let len = source_len(&mut inner).map_err(|e| io_error(path.as_deref(), e))?;
        debug!(path = ?path, bytes = len, "source opened");

        if len == 0 {
            debug!(path = ?path, "source is empty, nothing to do");
            return Err(ZstorError::EmptyInput);
        }

        let chunk_count = len.div_ceil(chunk_size as u64);
        let scratch_len = chunk_size.min(usize::try_from(len).unwrap_or(usize::MAX));

        Ok(Self {
            inner,
            path,
            len,
            chunk_size,
            chunk_count,
            offset: 0,
            produced: 0,
            scratch: vec![0u8; scratch_len],
        })
    }

    /// Read the next chunk into the scratch buffer.
    ///
    /// Returns `Ok(None)` once the whole source has been consumed. A source
    /// that ends before its recorded length fails with `ShortRead`; partial
    /// chunks are never returned.
    pub fn next_chunk(&mut self) -> ZstorResult<Option<&[u8]>> {
        let want = self.current_chunk_size();
        if want == 0 {
            return Ok(None);
        }

        let mut filled = 0;
        while filled < want {
            match self.inner.read(&mut self.scratch[filled..want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(self.path.as_deref(), e)),
            }
        }

        if filled < want {
            return Err(ZstorError::ShortRead {
                expected: want,
                actual: filled,
            });
        }

        self.offset += want as u64;
        self.produced += 1;
        debug!(
            index = self.produced - 1,
            bytes = want,
            offset = self.offset,
            "chunk read"
        );

        Ok(Some(&self.scratch[..want]))
    }

    /// Size of the chunk the next call to `next_chunk` will produce
    pub fn current_chunk_size(&self) -> usize {
        // remaining < chunk_size whenever the min picks it, so the cast is lossless
        self.remaining().min(self.chunk_size as u64) as usize
    }

    /// Total source length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Always false: empty sources are rejected at open
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nominal chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn remaining(&self) -> u64 {
        self.len - self.offset
    }

    /// Number of chunks produced so far (the index of the next chunk)
    pub fn chunks_read(&self) -> u64 {
        self.produced
    }
}

fn source_len<R: Seek>(inner: &mut R) -> std::io::Result<u64> {
    let len = inner.seek(SeekFrom::End(0))?;
    inner.seek(SeekFrom::Start(0))?;
    Ok(len)
}

fn io_error(path: Option<&Path>, e: std::io::Error) -> ZstorError {
    match path {
        Some(p) => ZstorError::file(p, e),
        None => ZstorError::Io(e),
    }
}
