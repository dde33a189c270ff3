//! Sequential writer for decoded chunks

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zstor_core::{ZstorError, ZstorResult};

/// Appends decoded chunks to a destination, in order.
///
/// Decoded chunks need not match the nominal chunk size, so no chunk
/// bookkeeping beyond counters is kept.
#[derive(Debug)]
pub struct ChunkWriter<W: Write = File> {
    out: BufWriter<W>,
    path: Option<PathBuf>,
    written: u64,
    chunks: u64,
}

impl ChunkWriter<File> {
    /// Create (or truncate) `path` for writing.
    pub fn create(path: &Path) -> ZstorResult<Self> {
        let file = File::create(path).map_err(|e| ZstorError::file(path, e))?;
        Ok(Self::build(file, Some(path.to_path_buf())))
    }

    /// Flush buffered output and sync the file to disk. Returns total bytes written.
    pub fn finish(mut self) -> ZstorResult<u64> {
        self.flush()?;
        self.out
            .get_ref()
            .sync_all()
            .map_err(|e| self.io_error(e))?;
        Ok(self.written)
    }
}

impl<W: Write> ChunkWriter<W> {
    /// Wrap an already-open sink.
    pub fn from_writer(inner: W) -> Self {
        Self::build(inner, None)
    }

    fn build(inner: W, path: Option<PathBuf>) -> Self {
        Self {
            out: BufWriter::new(inner),
            path,
            written: 0,
            chunks: 0,
        }
    }

    /// Append one decoded chunk.
    pub fn write(&mut self, data: &[u8]) -> ZstorResult<()> {
        self.out.write_all(data).map_err(|e| self.io_error(e))?;
        self.written += data.len() as u64;
        self.chunks += 1;
        debug!(index = self.chunks - 1, bytes = data.len(), "chunk written");
        Ok(())
    }

    /// Push buffered output to the underlying sink.
    pub fn flush(&mut self) -> ZstorResult<()> {
        self.out.flush().map_err(|e| self.io_error(e))
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn chunks_written(&self) -> u64 {
        self.chunks
    }

    /// Destination path, when writing to a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn io_error(&self, e: std::io::Error) -> ZstorError {
        match &self.path {
            Some(p) => ZstorError::file(p, e),
            None => ZstorError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut w = ChunkWriter::create(&path).unwrap();
        w.write(b"hello ").unwrap();
        w.write(b"world").unwrap();
        assert_eq!(w.chunks_written(), 2);
        assert_eq!(w.finish().unwrap(), 11);

        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn writes_into_any_sink() {
        let mut w = ChunkWriter::from_writer(Vec::new());
        w.write(b"abc").unwrap();
        w.write(b"de").unwrap();
        w.flush().unwrap();
        assert_eq!(w.bytes_written(), 5);
        assert!(w.path().is_none());
    }

    #[test]
    fn sink_failure_is_io_error() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut w = ChunkWriter::from_writer(Full);
        // larger than the buffer, so the sink sees it immediately
        let err = w.write(&[0u8; 64 * 1024]).unwrap_err();
        assert!(matches!(err, ZstorError::Io(_)));
        assert_eq!(w.bytes_written(), 0);
    }

    #[test]
    fn truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, vec![0xFFu8; 100]).unwrap();

        let mut w = ChunkWriter::create(&path).unwrap();
        w.write(b"abc").unwrap();
        w.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn unwritable_destination_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChunkWriter::create(&dir.path().join("missing/dir/out.bin")).unwrap_err();
        assert!(matches!(err, ZstorError::File { .. }));
    }
}
