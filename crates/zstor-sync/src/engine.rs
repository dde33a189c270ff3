//! Push and pull workers over the chunk codec
//!
//!   - `push_file`: chunk → encode → skip if store has the id → put
//!   - `pull_file`: get each frame → decode → append → rename into place
//!   - `encode_file` / `decode_chunks`: the same pipeline without a store

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use zstor_chunks::{digest_hex, ChunkReader, ChunkWriter};
use zstor_core::{Chunk, ChunkRef, ZstorError, ZstorResult};
use zstor_crypto::{ChunkCodec, Frame};
use zstor_storage::Remote;

/// Progress callback type (chunks_done, chunks_total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

/// Result of pushing a single file
#[derive(Debug, Clone, Serialize)]
pub struct PushResult {
    pub path: PathBuf,
    /// References needed to pull the file back, in order
    pub chunks: Vec<ChunkRef>,
    /// Plaintext bytes read
    pub bytes: u64,
    /// Encapsulated bytes produced (stored or not)
    pub frame_bytes: u64,
    /// Chunks actually written to the store
    pub uploaded: usize,
    /// Chunks whose id the store already had
    pub deduplicated: usize,
    /// true if the source was empty and nothing was pushed
    pub empty: bool,
}

/// Result of pulling a single file
#[derive(Debug, Clone, Serialize)]
pub struct PullResult {
    pub path: PathBuf,
    pub chunks: usize,
    pub bytes: u64,
}

/// Push `path` through `codec` into `remote`, one `chunk_size` chunk at a time.
///
/// An empty source is not an error: the result has `empty = true` and no
/// chunks. Failures inside the loop are tagged with the chunk index.
pub fn push_file(
    path: &Path,
    codec: &ChunkCodec,
    remote: &Remote,
    chunk_size: usize,
    progress: Option<&ProgressFn>,
) -> ZstorResult<PushResult> {
    if !remote.is_enabled() {
        return Err(ZstorError::RemoteDisabled);
    }

    let mut result = PushResult {
        path: path.to_path_buf(),
        chunks: Vec::new(),
        bytes: 0,
        frame_bytes: 0,
        uploaded: 0,
        deduplicated: 0,
        empty: false,
    };

    let Some(mut reader) = open_reader(path, chunk_size)? else {
        result.empty = true;
        return Ok(result);
    };
    let total = reader.chunk_count();

    loop {
        let index = result.chunks.len() as u64;
        let Some(plain) = reader.next_chunk().map_err(|e| e.in_chunk(index))? else {
            break;
        };

        let size = plain.len() as u64;
        let chunk = codec.encode(plain).map_err(|e| e.in_chunk(index))?;

        if remote.exists(&chunk.id).map_err(|e| e.in_chunk(index))? {
            debug!(index, id = %chunk.id, "dedup: already stored");
            result.deduplicated += 1;
        } else {
            remote
                .put(&chunk.id, &chunk.data)
                .map_err(|e| e.in_chunk(index))?;
            result.uploaded += 1;
        }

        result.bytes += size;
        result.frame_bytes += chunk.len() as u64;
        result.chunks.push(ChunkRef::from_chunk(index, size, &chunk));

        report(progress, index + 1, total);
    }

    info!(
        path = %path.display(),
        chunks = result.chunks.len(),
        bytes = result.bytes,
        frame_bytes = result.frame_bytes,
        uploaded = result.uploaded,
        deduplicated = result.deduplicated,
        "pushed"
    );

    Ok(result)
}

/// Fetch `refs` from `remote`, decode them, and write the plaintext to `dest`.
///
/// Output goes to a hidden sibling of `dest` that is renamed into place only
/// once every chunk has been verified, so `dest` is never left half written.
pub fn pull_file(
    refs: &[ChunkRef],
    codec: &ChunkCodec,
    remote: &Remote,
    dest: &Path,
    progress: Option<&ProgressFn>,
) -> ZstorResult<PullResult> {
    if !remote.is_enabled() {
        return Err(ZstorError::RemoteDisabled);
    }

    let total = refs.len() as u64;
    let bytes = write_atomically(dest, |writer| {
        for (pos, chunk_ref) in refs.iter().enumerate() {
            let index = chunk_ref.index;
            if index != pos as u64 {
                return Err(ZstorError::CorruptData(format!(
                    "chunk refs out of order: index {index} at position {pos}"
                )));
            }

            let frame = remote.get(&chunk_ref.id).map_err(|e| e.in_chunk(index))?;
            let plain = decode_ref(codec, chunk_ref, &frame).map_err(|e| e.in_chunk(index))?;
            append_chunk(writer, index, &plain)?;

            report(progress, index + 1, total);
        }
        Ok(())
    })?;

    info!(dest = %dest.display(), chunks = refs.len(), bytes, "pulled");

    Ok(PullResult {
        path: dest.to_path_buf(),
        chunks: refs.len(),
        bytes,
    })
}

/// A chunk produced by [`encode_file`] together with its plaintext length
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub index: u64,
    pub size: u64,
    pub chunk: Chunk,
}

impl EncodedChunk {
    pub fn chunk_ref(&self) -> ChunkRef {
        ChunkRef::from_chunk(self.index, self.size, &self.chunk)
    }
}

/// Encode every chunk of `path` in memory. An empty source yields no chunks.
pub fn encode_file(
    path: &Path,
    codec: &ChunkCodec,
    chunk_size: usize,
) -> ZstorResult<Vec<EncodedChunk>> {
    let Some(mut reader) = open_reader(path, chunk_size)? else {
        return Ok(Vec::new());
    };

    let mut encoded = Vec::with_capacity(reader.chunk_count() as usize);
    loop {
        let index = encoded.len() as u64;
        let Some(plain) = reader.next_chunk().map_err(|e| e.in_chunk(index))? else {
            break;
        };
        let size = plain.len() as u64;
        let chunk = codec.encode(plain).map_err(|e| e.in_chunk(index))?;
        encoded.push(EncodedChunk { index, size, chunk });
    }

    debug!(path = %path.display(), chunks = encoded.len(), "encoded");
    Ok(encoded)
}

/// Decode `chunks` in order into `dest`. Returns the bytes written.
pub fn decode_chunks(chunks: &[Chunk], codec: &ChunkCodec, dest: &Path) -> ZstorResult<u64> {
    let bytes = write_atomically(dest, |writer| {
        for (index, chunk) in chunks.iter().enumerate() {
            let index = index as u64;
            let plain = codec.decode(chunk).map_err(|e| e.in_chunk(index))?;
            append_chunk(writer, index, &plain)?;
        }
        Ok(())
    })?;

    debug!(dest = %dest.display(), chunks = chunks.len(), bytes, "decoded");
    Ok(bytes)
}

/// Open a chunk reader, mapping the advisory empty-source case to `None`.
fn open_reader(path: &Path, chunk_size: usize) -> ZstorResult<Option<ChunkReader>> {
    match ChunkReader::open_with_chunk_size(path, chunk_size) {
        Ok(reader) => Ok(Some(reader)),
        Err(e) if e.is_advisory() => {
            warn!(path = %path.display(), "{e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn decode_ref(codec: &ChunkCodec, chunk_ref: &ChunkRef, frame: &[u8]) -> ZstorResult<Vec<u8>> {
    let stored_id = digest_hex(Frame::parse(frame)?.ciphertext());
    if stored_id != chunk_ref.id {
        return Err(ZstorError::CorruptData(format!(
            "object {} does not match its identifier (hashes to {stored_id})",
            chunk_ref.id
        )));
    }

    let plain = codec.decode_frame(frame, &chunk_ref.key)?;
    if plain.len() as u64 != chunk_ref.size {
        return Err(ZstorError::CorruptData(format!(
            "decoded {} bytes, expected {}",
            plain.len(),
            chunk_ref.size
        )));
    }
    Ok(plain)
}

fn append_chunk<W: Write>(writer: &mut ChunkWriter<W>, index: u64, plain: &[u8]) -> ZstorResult<()> {
    writer.write(plain).map_err(|e| e.in_chunk(index))
}

fn write_atomically<F>(dest: &Path, fill: F) -> ZstorResult<u64>
where
    F: FnOnce(&mut ChunkWriter) -> ZstorResult<()>,
{
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ZstorError::file(parent, e))?;
    }

    let tmp = tmp_sibling(dest);
    let outcome = ChunkWriter::create(&tmp).and_then(|mut writer| {
        fill(&mut writer)?;
        writer.finish()
    });

    match outcome {
        Ok(bytes) => {
            fs::rename(&tmp, dest).map_err(|e| ZstorError::file(dest, e))?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn tmp_sibling(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.zstor_tmp"))
}

fn report(progress: Option<&ProgressFn>, done: u64, total: u64) {
    if let Some(cb) = progress {
        cb(done, total, &format!("chunk {done}/{total}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_sibling_is_hidden_next_to_dest() {
        let tmp = tmp_sibling(Path::new("/data/out/file.bin"));
        assert_eq!(tmp, Path::new("/data/out/.file.bin.zstor_tmp"));
    }

    #[test]
    fn failed_fill_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let err = write_atomically(&dest, |w| {
            w.write(b"partial")?;
            Err(ZstorError::CorruptData("boom".into()))
        })
        .unwrap_err();

        assert!(matches!(err, ZstorError::CorruptData(_)));
        assert!(!dest.exists());
        assert!(!tmp_sibling(&dest).exists());
    }

    #[test]
    fn destination_failure_names_the_chunk() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = ChunkWriter::from_writer(Full);
        let err = append_chunk(&mut writer, 3, &[0u8; 64 * 1024]).unwrap_err();
        match &err {
            ZstorError::Chunk { index, .. } => assert_eq!(*index, 3),
            other => panic!("expected chunk error, got {other:?}"),
        }
        assert!(matches!(err.root(), ZstorError::Io(_)));
    }

    #[test]
    fn push_requires_remote() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"data").unwrap();
        let err = push_file(&src, &ChunkCodec::default(), &Remote::Disabled, 4, None).unwrap_err();
        assert!(matches!(err, ZstorError::RemoteDisabled));
    }
}
