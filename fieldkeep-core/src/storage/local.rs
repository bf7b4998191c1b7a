/*!
Local filesystem storage adapter.
*/

use super::StorageAdapter;
use crate::{FieldkeepError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stores backups as files on the local filesystem.
///
/// Writes go to a temporary file in the destination directory which is then
/// renamed over the destination, so a reader never sees a half-written backup.
/// Missing parent directories are created.
///
/// # Example
/// ```rust,no_run
/// use fieldkeep_core::storage::{LocalFileStorage, StorageAdapter};
///
/// let storage = LocalFileStorage::with_base_dir("/var/fieldkeep/backups");
/// storage.save(b"{}", "contract_bookmark_backup.json")?;
/// # Ok::<(), fieldkeep_core::FieldkeepError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    /// Relative paths are resolved against this directory when set
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Paths are used as given
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }

    fn write_atomic(full_path: &Path, data: &[u8]) -> std::io::Result<()> {
        let dir = match full_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(data)?;
        file.as_file().sync_all()?;
        file.persist(full_path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        Self::write_atomic(&full_path, data)
            .map_err(|e| FieldkeepError::persist(full_path.display().to_string(), e.to_string()))
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);
        fs::read(&full_path)
            .map_err(|e| FieldkeepError::load(full_path.display().to_string(), e.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).is_file()
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        if full_path.exists() {
            fs::remove_file(&full_path).map_err(|e| {
                FieldkeepError::persist(full_path.display().to_string(), format!("delete failed: {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_file_storage_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path());
        let path = "contract_bookmark_backup.json";

        storage.save(b"{\"a\": 1}", path).unwrap();
        assert!(storage.exists(path));
        assert_eq!(storage.load(path).unwrap(), b"{\"a\": 1}");

        storage.save(b"{}", path).unwrap();
        assert_eq!(storage.load(path).unwrap(), b"{}");

        storage.delete(path).unwrap();
        assert!(!storage.exists(path));
        assert!(storage.delete(path).is_ok());
    }

    #[test]
    fn test_nested_directories_are_created() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path());
        let path = "clients/acme/2024/backup.json";

        storage.save(b"[]", path).unwrap();
        assert!(temp_dir.path().join(path).is_file());
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path());
        storage.save(b"data", "only.json").unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("only.json")]);
    }

    #[test]
    fn test_load_missing_file_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path());

        match storage.load("nonexistent.json") {
            Err(FieldkeepError::Load { path, .. }) => assert!(path.ends_with("nonexistent.json")),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_save_into_file_parent_is_persist_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("blocker"), b"x").unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path());

        let err = storage.save(b"{}", "blocker/backup.json").unwrap_err();
        assert!(matches!(err, FieldkeepError::Persist { .. }));
    }
}
