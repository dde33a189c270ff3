//! In-memory object store (tests and dry runs)

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use zstor_core::{ZstorError, ZstorResult};

use crate::remote::ObjectStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        // a count is still meaningful after a panicking writer
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> ZstorResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.objects
            .lock()
            .map_err(|_| ZstorError::Storage("memory store lock poisoned".into()))
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, id: &str, frame: &[u8]) -> ZstorResult<()> {
        self.lock()?.insert(id.to_string(), frame.to_vec());
        Ok(())
    }

    fn get(&self, id: &str) -> ZstorResult<Vec<u8>> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| ZstorError::NotFound(id.to_string()))
    }

    fn exists(&self, id: &str) -> ZstorResult<bool> {
        Ok(self.lock()?.contains_key(id))
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
