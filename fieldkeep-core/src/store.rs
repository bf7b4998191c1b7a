/*!
Backup store: saves and loads [`BackupRecord`]s as pretty-printed JSON through a
[`StorageAdapter`].
*/

use crate::record::BackupRecord;
use crate::storage::{LocalFileStorage, StorageAdapter};
use crate::{FieldkeepError, Result};
use tracing::{debug, info};

/// Persists backup records.
///
/// # Example
/// ```rust,no_run
/// use fieldkeep_core::{create_default_store, FieldExtractor};
///
/// let store = create_default_store();
/// let record = FieldExtractor::new().extract("contract.docx");
/// store.save(&record, "contract_bookmark_backup.json")?;
/// let loaded = store.load("contract_bookmark_backup.json")?;
/// assert_eq!(loaded, record);
/// # Ok::<(), fieldkeep_core::FieldkeepError>(())
/// ```
pub struct BackupStore<S: StorageAdapter> {
    storage: S,
}

impl<S: StorageAdapter> BackupStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Serialize `record` and write it to `path`.
    ///
    /// # Errors
    /// * `FieldkeepError::Persist` - if serialization or the write fails
    pub fn save(&self, record: &BackupRecord, path: &str) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| FieldkeepError::persist(path, e.to_string()))?;
        self.storage.save(&json, path)?;

        info!(
            fields = record.total_fields(),
            bytes = json.len(),
            "Backup saved to {path}"
        );
        Ok(())
    }

    /// Read and validate the record at `path`.
    ///
    /// # Errors
    /// * `FieldkeepError::Load` - if the file is missing, is not a backup record,
    ///   or holds a field in the wrong group
    pub fn load(&self, path: &str) -> Result<BackupRecord> {
        let data = self.storage.load(path)?;
        let record: BackupRecord = serde_json::from_slice(&data)
            .map_err(|e| FieldkeepError::load(path, e.to_string()))?;
        record
            .validate()
            .map_err(|e| FieldkeepError::load(path, e.to_string()))?;

        debug!(
            source = record.file_path(),
            fields = record.total_fields(),
            "Backup loaded from {path}"
        );
        Ok(record)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.storage.exists(path)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.storage.delete(path)
    }
}

/// Store backed by the local filesystem with paths used as given.
pub fn create_default_store() -> BackupStore<LocalFileStorage> {
    BackupStore::new(LocalFileStorage::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, LabelPattern, PlaceholderFamily};
    use crate::record::{FieldGroup, FieldMap};
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    fn map(fields: Vec<(&str, Field)>) -> FieldMap {
        fields.into_iter().map(|(k, f)| (k.to_string(), f)).collect()
    }

    fn record() -> BackupRecord {
        BackupRecord::new("/docs/contract.docx", Utc.with_ymd_and_hms(2024, 5, 2, 9, 15, 0).unwrap())
            .with_group(
                FieldGroup::Bookmarks,
                map(vec![("PO_NUMBER", Field::bookmark("PO_NUMBER", "12345", "0"))]),
            )
            .with_group(
                FieldGroup::ContentControls,
                map(vec![
                    (
                        "client",
                        Field::content_control("client", "ACME \"Intl\"", Some("client".into()), None),
                    ),
                    (
                        "content_control_1",
                        Field::content_control("content_control_1", "", None, None),
                    ),
                ]),
            )
            .with_group(
                FieldGroup::EmptyFields,
                map(vec![(
                    "empty_field_1_Họ_tên",
                    Field::empty("Họ tên", LabelPattern::AccentedLabel),
                )]),
            )
            .with_group(
                FieldGroup::PlaceholderPatterns,
                map(vec![
                    ("brace_Date", Field::placeholder("Date", "{Date}", PlaceholderFamily::Brace)),
                    (
                        "dollar_brace_Date",
                        Field::placeholder("Date", "${Date}", PlaceholderFamily::DollarBrace),
                    ),
                ]),
            )
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = BackupStore::new(MemoryStorage::new());
        let original = record();

        store.save(&original, "backup.json").unwrap();
        assert!(store.exists("backup.json"));
        assert_eq!(store.load("backup.json").unwrap(), original);
    }

    #[test]
    fn test_output_is_pretty_json_with_type_tags() {
        let store = BackupStore::new(MemoryStorage::new());
        store.save(&record(), "backup.json").unwrap();

        let raw = String::from_utf8(store.storage().load("backup.json").unwrap()).unwrap();
        assert!(raw.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["bookmarks"]["PO_NUMBER"]["type"], "bookmark");
        assert_eq!(value["bookmarks"]["PO_NUMBER"]["id"], "0");
        assert_eq!(value["content_controls"]["content_control_1"]["tag"], serde_json::Value::Null);
        assert_eq!(value["placeholder_patterns"]["dollar_brace_Date"]["pattern_type"], "dollar_brace");
        assert_eq!(value["file_path"], "/docs/contract.docx");
    }

    #[test]
    fn test_load_missing_is_load_error() {
        let store = BackupStore::new(MemoryStorage::new());
        assert!(matches!(store.load("nope.json"), Err(FieldkeepError::Load { .. })));
    }

    #[test]
    fn test_load_garbage_is_load_error() {
        let storage = MemoryStorage::new();
        storage.insert_raw("bad.json", b"{ not json");
        let store = BackupStore::new(storage);

        match store.load("bad.json") {
            Err(FieldkeepError::Load { path, .. }) => assert_eq!(path, "bad.json"),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_accepts_naive_timestamp_and_keeps_key_order() {
        let storage = MemoryStorage::new();
        storage.insert_raw(
            "legacy.json",
            br#"{
  "file_path": "C:\\docs\\order.docx",
  "extraction_time": "2024-01-01T12:00:00.123456",
  "bookmarks": {
    "Invoice Date": {"name": "Invoice Date", "value": "INV-9", "id": "0", "type": "bookmark"},
    "Date": {"name": "Date", "value": "2024-05-01", "id": "1", "type": "bookmark"}
  },
  "form_fields": {},
  "content_controls": {},
  "placeholder_patterns": {},
  "empty_fields": {}
}"#,
        );
        let store = BackupStore::new(storage);

        let record = store.load("legacy.json").unwrap();

        assert_eq!(
            record.extraction_time(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::microseconds(123_456)
        );
        assert_eq!(record.file_path(), r"C:\docs\order.docx");
        let keys: Vec<&str> = record.bookmarks().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Invoice Date", "Date"]);
    }

    #[test]
    fn test_load_rejects_field_in_wrong_group() {
        let storage = MemoryStorage::new();
        storage.insert_raw(
            "mixed.json",
            br#"{
                "file_path": "a.docx",
                "extraction_time": "2024-01-01T00:00:00Z",
                "bookmarks": {"x": {"name": "x", "value": "", "pattern_type": "two_word_label", "type": "empty_field"}}
            }"#,
        );
        let store = BackupStore::new(storage);

        let err = store.load("mixed.json").unwrap_err();
        assert!(matches!(err, FieldkeepError::Load { .. }));
        assert!(err.to_string().contains("bookmarks"));
    }

    #[test]
    fn test_delete() {
        let store = BackupStore::new(MemoryStorage::new());
        store.save(&record(), "backup.json").unwrap();
        store.delete("backup.json").unwrap();
        assert!(!store.exists("backup.json"));
    }
}
