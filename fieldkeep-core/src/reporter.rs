/*!
Reference table appended to restored documents.

The table lists every non-empty bookmark and content control value so a reader
can restore by hand whatever the inline pass could not place.
*/

use crate::config::ReferenceConfig;
use crate::document::{DocumentContainer, TextRun};
use crate::record::BackupRecord;
use crate::Result;
use tracing::debug;

const HEADER: [&str; 2] = ["Field Name", "Value"];

/// Appends the reference section to a document.
#[derive(Debug, Clone, Default)]
pub struct ReferenceReporter {
    config: ReferenceConfig,
}

impl ReferenceReporter {
    pub fn new(config: ReferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReferenceConfig {
        &self.config
    }

    /// Append page break, heading, table and note; returns the number of rows
    /// listed. Nothing is appended when the record has no values to list.
    pub fn append(&self, record: &BackupRecord, document: &mut dyn DocumentContainer) -> Result<usize> {
        let entries = record.reference_entries();
        if entries.is_empty() {
            debug!("No bookmark or content control values; skipping reference table");
            return Ok(0);
        }

        let mut rows = Vec::with_capacity(entries.len() + 1);
        rows.push(HEADER.iter().map(|cell| cell.to_string()).collect());
        rows.extend(
            entries
                .iter()
                .map(|(name, value)| vec![name.clone(), truncate(value, self.config.value_limit)]),
        );

        document.add_page_break()?;
        document.add_heading(&self.config.heading, self.config.heading_level)?;
        document.add_table(&rows, &self.config.table_style)?;
        document.add_paragraph(&[TextRun::bold("Note: "), TextRun::plain(self.config.note.as_str())])?;

        debug!(rows = entries.len(), "Reference table appended");
        Ok(entries.len())
    }
}

/// First `limit` characters of `value`.
pub fn truncate(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AppendedBlock, MemoryDocument, MockDocumentContainer};
    use crate::field::{Field, PlaceholderFamily};
    use crate::record::{FieldGroup, FieldMap};
    use crate::FieldkeepError;
    use chrono::Utc;

    fn record() -> BackupRecord {
        let mut bookmarks = FieldMap::new();
        bookmarks.insert("PO_NUMBER".into(), Field::bookmark("PO_NUMBER", "12345", "0"));
        bookmarks.insert("Blank".into(), Field::bookmark("Blank", "  ", "1"));
        let mut controls = FieldMap::new();
        controls.insert(
            "Invoice Date".into(),
            Field::content_control("Invoice Date", "2024-01-01", None, Some("Invoice Date".into())),
        );
        let mut placeholders = FieldMap::new();
        placeholders.insert(
            "bracket_Date".into(),
            Field::placeholder("Date", "[Date]", PlaceholderFamily::Bracket),
        );

        BackupRecord::new("a.docx", Utc::now())
            .with_group(FieldGroup::Bookmarks, bookmarks)
            .with_group(FieldGroup::ContentControls, controls)
            .with_group(FieldGroup::PlaceholderPatterns, placeholders)
    }

    #[test]
    fn test_reference_section_layout() {
        let mut document = MemoryDocument::default();
        let rows = ReferenceReporter::default().append(&record(), &mut document).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(document.appended.len(), 4);
        assert_eq!(document.appended[0], AppendedBlock::PageBreak);
        assert_eq!(
            document.appended[1],
            AppendedBlock::Heading("Extracted Field Values (Reference)".into(), 2)
        );
        assert_eq!(
            document.appended[2],
            AppendedBlock::Table {
                rows: vec![
                    vec!["Field Name".to_string(), "Value".to_string()],
                    vec!["PO_NUMBER".to_string(), "12345".to_string()],
                    vec!["Invoice Date".to_string(), "2024-01-01".to_string()],
                ],
                style: "LightShading-Accent1".into(),
            }
        );
        match &document.appended[3] {
            AppendedBlock::Paragraph(runs) => {
                assert_eq!(runs[0], TextRun::bold("Note: "));
                assert!(!runs[1].bold);
            }
            other => panic!("expected note paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_long_values_are_cut() {
        let mut bookmarks = FieldMap::new();
        let long = "é".repeat(250);
        bookmarks.insert("Body".into(), Field::bookmark("Body", long.as_str(), "0"));
        let record = BackupRecord::new("a.docx", Utc::now()).with_group(FieldGroup::Bookmarks, bookmarks);

        let mut document = MemoryDocument::default();
        ReferenceReporter::default().append(&record, &mut document).unwrap();

        let table = document.tables()[0];
        assert_eq!(table[1][1].chars().count(), 200);
    }

    #[test]
    fn test_nothing_appended_without_values() {
        let mut document = MemoryDocument::default();
        let record = BackupRecord::new("a.docx", Utc::now());

        assert_eq!(ReferenceReporter::default().append(&record, &mut document).unwrap(), 0);
        assert!(document.appended.is_empty());
    }

    #[test]
    fn test_append_failure_propagates() {
        let mut document = MockDocumentContainer::new();
        document.expect_add_page_break().returning(|| Ok(()));
        document
            .expect_add_heading()
            .returning(|_, _| Err(FieldkeepError::invalid_document("read-only")));
        document.expect_add_table().never();

        assert!(ReferenceReporter::default().append(&record(), &mut document).is_err());
    }
}
