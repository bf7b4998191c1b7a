/*!
Storage adapters for backup persistence.

[`StorageAdapter`] is the port the backup store writes through; the local
filesystem is the only production adapter.
*/

pub mod local;

use crate::Result;

pub use local::LocalFileStorage;

/// Byte-level storage for backup files
pub trait StorageAdapter {
    /// Write `data` to `path`, replacing any previous content
    ///
    /// # Errors
    /// `FieldkeepError::Persist` naming the resolved path
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Read the full content at `path`
    ///
    /// # Errors
    /// `FieldkeepError::Load` naming the resolved path
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;

    /// Remove `path`; removing a missing entry is not an error
    fn delete(&self, path: &str) -> Result<()>;
}

/// In-memory storage for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    data: std::cell::RefCell<std::collections::HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes directly, bypassing any serializer
    pub fn insert_raw(&self, path: &str, data: &[u8]) {
        self.data.borrow_mut().insert(path.to_string(), data.to_vec());
    }
}

#[cfg(test)]
impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        self.insert_raw(path, data);
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        self.data
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| crate::FieldkeepError::load(path, "not found"))
    }

    fn exists(&self, path: &str) -> bool {
        self.data.borrow().contains_key(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.data.borrow_mut().remove(path);
        Ok(())
    }
}
