//! Filesystem object store
//!
//! Layout: `{root}/{id[0..2]}/{id}` (two-level sharding). Objects are written
//! to a uniquely named temp file in the shard directory and renamed into place,
//! so concurrent writers of the same id never share a temp path.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use zstor_chunks::is_digest_hex;
use zstor_core::{ZstorError, ZstorResult};

use crate::remote::ObjectStore;

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> ZstorResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| ZstorError::file(&root, e))?;
        debug!(root = %root.display(), "opened directory store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object with this id is stored at.
    pub fn path_for(&self, id: &str) -> ZstorResult<PathBuf> {
        // ids become path components, so only accept digest hex
        if !is_digest_hex(id) {
            return Err(ZstorError::Storage(format!("invalid object id {id:?}")));
        }
        Ok(self.root.join(&id[..2]).join(id))
    }
}

impl ObjectStore for DirectoryStore {
    fn put(&self, id: &str, frame: &[u8]) -> ZstorResult<()> {
        let path = self.path_for(id)?;
        let shard = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(shard).map_err(|e| ZstorError::file(shard, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".put")
            .tempfile_in(shard)
            .map_err(|e| ZstorError::file(shard, e))?;
        tmp.write_all(frame)
            .map_err(|e| ZstorError::file(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| ZstorError::file(&path, e.error))?;

        trace!(id, bytes = frame.len(), "stored object");
        Ok(())
    }

    fn get(&self, id: &str) -> ZstorResult<Vec<u8>> {
        let path = self.path_for(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ZstorError::NotFound(id.to_string())),
            Err(e) => Err(ZstorError::file(&path, e)),
        }
    }

    fn exists(&self, id: &str) -> ZstorResult<bool> {
        let path = self.path_for(id)?;
        path.try_exists().map_err(|e| ZstorError::file(&path, e))
    }

    fn describe(&self) -> String {
        format!("directory:{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zstor_chunks::digest_hex;

    #[test]
    fn sharded_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let id = digest_hex(b"frame bytes");

        store.put(&id, b"frame bytes").unwrap();

        let expected = dir.path().join(&id[..2]).join(&id);
        assert!(expected.is_file());
        assert_eq!(fs::read(&expected).unwrap(), b"frame bytes");
        let entries = fs::read_dir(dir.path().join(&id[..2])).unwrap().count();
        assert_eq!(entries, 1, "temp file left in shard");
    }

    #[test]
    fn concurrent_puts_of_one_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let frame = vec![0x5a; 256 * 1024];
        let id = digest_hex(&frame);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| store.put(&id, &frame))).collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }
        });

        assert_eq!(store.get(&id).unwrap(), frame);
        let entries = fs::read_dir(dir.path().join(&id[..2])).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn put_get_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let id = digest_hex(b"abc");

        assert!(!store.exists(&id).unwrap());
        store.put(&id, b"abc").unwrap();
        assert!(store.exists(&id).unwrap());
        assert_eq!(store.get(&id).unwrap(), b"abc");

        // overwrite is idempotent for identical content
        store.put(&id, b"abc").unwrap();
        assert_eq!(store.get(&id).unwrap(), b"abc");
    }

    #[test]
    fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let id = digest_hex(b"never stored");
        assert!(matches!(store.get(&id), Err(ZstorError::NotFound(got)) if got == id));
    }

    #[test]
    fn rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        for bad in ["", "../etc/passwd", "ab", "not-hex"] {
            assert!(matches!(store.put(bad, b"x"), Err(ZstorError::Storage(_))));
            assert!(matches!(store.get(bad), Err(ZstorError::Storage(_))));
        }
    }

    #[test]
    fn open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a/b/c");
        let store = DirectoryStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
        assert!(store.describe().starts_with("directory:"));
    }
}
