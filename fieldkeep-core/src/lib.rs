/*!
# fieldkeep core

Preserves the values held in a document's fields across a lossy conversion.

Before conversion, [`FieldExtractor`] reads bookmarks, content controls,
placeholder patterns and blank labelled fields from the source document into a
[`BackupRecord`], which [`BackupStore`] saves as JSON. After conversion,
[`FieldRestorer`] writes the recovered values back into matching empty slots of
the converted document and appends a reference table listing every value.

## Architecture

- Documents are reached only through [`DocumentContainer`]; [`DocxDocument`]
  is the WordprocessingML adapter.
- Each field kind is found by its own [`ExtractionStrategy`]; a failing
  strategy leaves its group empty without affecting the others.
- Backups go through a pluggable [`StorageAdapter`].

## Usage

```rust,no_run
use fieldkeep_core::{create_default_store, FieldExtractor, FieldRestorer};

let record = FieldExtractor::new().extract("contract.docx");
let store = create_default_store();
store.save(&record, "contract_bookmark_backup.json")?;

// ... convert contract.docx into converted.docx ...

let record = store.load("contract_bookmark_backup.json")?;
let report = FieldRestorer::default().restore(&record, "converted.docx", "converted_restored.docx")?;
println!("{} slots restored", report.restored);
# Ok::<(), fieldkeep_core::FieldkeepError>(())
```
*/

pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod field;
pub mod observability;
pub mod record;
pub mod reporter;
pub mod restorer;
pub mod storage;
pub mod store;


pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{PreserveConfig, ReferenceConfig};
pub use document::{DocumentContainer, DocxDocument, TextRun};
pub use error::{FieldkeepError, Result};
pub use extractor::{ExtractionStrategy, FieldExtractor};
pub use field::{Field, FieldKind, FieldOrigin, LabelPattern, PlaceholderFamily};
pub use record::{BackupRecord, FieldGroup, FieldMap, GroupCounts};
pub use reporter::ReferenceReporter;
pub use restorer::{FieldRestorer, PartialRestoreWarning, RestoreReport, SlotMatcher, SlotStrategy};
pub use storage::{LocalFileStorage, StorageAdapter};
pub use store::{create_default_store, BackupStore};

use std::path::{Path, PathBuf};

/// Extract fields from `input` and save them.
///
/// The backup goes to `backup`, or to the default path beside the input.
/// Returns the record and where it was written.
///
/// # Errors
/// * `FieldkeepError::Extraction` - if `input` does not exist
/// * `FieldkeepError::Persist` - if the backup cannot be written
pub fn extract_and_backup<P: AsRef<Path>>(
    input: P,
    backup: Option<&Path>,
    config: &PreserveConfig,
) -> Result<(BackupRecord, PathBuf)> {
    let input = input.as_ref();
    if !input.is_file() {
        return Err(FieldkeepError::extraction(format!(
            "input document not found: {}",
            input.display()
        )));
    }

    let record = FieldExtractor::new().extract(input);
    let backup_path = backup
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.backup_path_for(input));
    create_default_store().save(&record, &backup_path.to_string_lossy())?;
    Ok((record, backup_path))
}

/// Load the backup at `backup` and restore it into `target`.
///
/// The result goes to `output`, or to the default path beside the target.
///
/// # Errors
/// * `FieldkeepError::Load` - if the backup is missing or unparsable
/// * `FieldkeepError::Restore` - if the target cannot be read or the output written
pub fn restore_from_backup<P: AsRef<Path>, Q: AsRef<Path>>(
    backup: P,
    target: Q,
    output: Option<&Path>,
    config: &PreserveConfig,
) -> Result<RestoreReport> {
    let target = target.as_ref();
    let record = create_default_store().load(&backup.as_ref().to_string_lossy())?;
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_path_for(target));

    FieldRestorer::new(ReferenceReporter::new(config.reference.clone())).restore(
        &record,
        target,
        &output_path,
    )
}
