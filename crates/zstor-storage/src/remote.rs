//! Object-store capability

use std::fmt;

use zstor_core::config::{RemoteConfig, RemoteKind};
use zstor_core::{ZstorError, ZstorResult};

use crate::directory::DirectoryStore;

/// Key/value store for encoded frames, keyed by chunk identifier.
pub trait ObjectStore: Send + Sync {
    /// Store `frame` under `id`. Storing the same id twice is harmless.
    fn put(&self, id: &str, frame: &[u8]) -> ZstorResult<()>;

    /// Fetch the frame stored under `id`, or `NotFound`.
    fn get(&self, id: &str) -> ZstorResult<Vec<u8>>;

    fn exists(&self, id: &str) -> ZstorResult<bool>;

    /// Short backend description for logs
    fn describe(&self) -> String;
}

/// The storage collaborator as seen by the orchestrator
pub enum Remote {
    Disabled,
    ObjectStore(Box<dyn ObjectStore>),
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remote::Disabled => f.write_str("Remote::Disabled"),
            Remote::ObjectStore(store) => write!(f, "Remote::ObjectStore({})", store.describe()),
        }
    }
}

impl Remote {
    pub fn new(store: impl ObjectStore + 'static) -> Self {
        Remote::ObjectStore(Box::new(store))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Remote::ObjectStore(_))
    }

    pub fn put(&self, id: &str, frame: &[u8]) -> ZstorResult<()> {
        self.store()?.put(id, frame)
    }

    pub fn get(&self, id: &str) -> ZstorResult<Vec<u8>> {
        self.store()?.get(id)
    }

    pub fn exists(&self, id: &str) -> ZstorResult<bool> {
        self.store()?.exists(id)
    }

    fn store(&self) -> ZstorResult<&dyn ObjectStore> {
        match self {
            Remote::Disabled => Err(ZstorError::RemoteDisabled),
            Remote::ObjectStore(store) => Ok(store.as_ref()),
        }
    }
}

/// Build the remote described by the `[remote]` config section.
pub fn build_remote(cfg: &RemoteConfig) -> ZstorResult<Remote> {
    match cfg.kind {
        RemoteKind::Disabled => Ok(Remote::Disabled),
        RemoteKind::Directory => {
            let root = cfg.path.as_deref().ok_or_else(|| {
                ZstorError::Config("remote.kind = \"directory\" requires remote.path".into())
            })?;
            Ok(Remote::new(DirectoryStore::open(root)?))
        }
    }
}
