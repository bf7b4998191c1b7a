/*!
Field extraction.

[`FieldExtractor`] runs a list of [`ExtractionStrategy`] implementations over one
source document and assembles their results into a [`BackupRecord`]. Each
strategy owns one group of the record; a strategy that fails leaves its group
empty and never affects the others.
*/

pub mod markup;
pub mod text;

use crate::clock::{Clock, SystemClock};
use crate::document::{DocumentContainer, DocxDocument};
use crate::record::{BackupRecord, FieldGroup, FieldMap};
use crate::{FieldkeepError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

pub use markup::{BookmarkStrategy, ContentControlStrategy};
pub use text::{EmptyFieldStrategy, PlaceholderStrategy};

/// One way of recognising fields in a document.
#[cfg_attr(test, mockall::automock)]
pub trait ExtractionStrategy {
    /// Group of the backup record this strategy fills.
    fn group(&self) -> FieldGroup;

    /// Recognise every field of this strategy's kind in `source`.
    fn extract(&self, source: &dyn DocumentContainer) -> Result<FieldMap>;
}

/// The four built-in strategies in record order.
pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(BookmarkStrategy),
        Box::new(ContentControlStrategy),
        Box::new(EmptyFieldStrategy),
        Box::new(PlaceholderStrategy),
    ]
}

/// Builds backup records from source documents.
///
/// # Example
/// ```rust,no_run
/// use fieldkeep_core::FieldExtractor;
///
/// let record = FieldExtractor::new().extract("contract.docx");
/// println!("{} fields", record.total_fields());
/// ```
pub struct FieldExtractor<C: Clock = SystemClock> {
    clock: C,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl FieldExtractor<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FieldExtractor<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FieldExtractor<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_strategies(clock, default_strategies())
    }

    pub fn with_strategies(clock: C, strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { clock, strategies }
    }

    /// Extract every field from the document at `path`.
    ///
    /// This never fails. A document that cannot be opened yields a record with
    /// all groups empty; the cause is logged once per strategy.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> BackupRecord {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        info!("Extracting fields from {file_path}");

        match DocxDocument::open(path) {
            Ok(document) => self.extract_from(&document, &file_path),
            Err(e) => {
                let reason = format!("cannot open source document: {e}");
                self.assemble(&file_path, |_| Err(FieldkeepError::extraction(reason.as_str())))
            }
        }
    }

    /// Extract every field from an already opened document.
    pub fn extract_from(&self, source: &dyn DocumentContainer, file_path: &str) -> BackupRecord {
        self.assemble(file_path, |strategy| strategy.extract(source))
    }

    fn assemble<F>(&self, file_path: &str, mut run: F) -> BackupRecord
    where
        F: FnMut(&dyn ExtractionStrategy) -> Result<FieldMap>,
    {
        let mut record = BackupRecord::new(file_path, self.clock.now());

        for strategy in &self.strategies {
            let group = strategy.group();
            let fields = match run(strategy.as_ref()) {
                Ok(fields) => {
                    debug!(group = %group, count = fields.len(), "Strategy finished");
                    fields
                }
                Err(e) => {
                    warn!(group = %group, "Extraction failed: {e}");
                    #[cfg(feature = "metrics")]
                    if let Some(metrics) = crate::observability::FieldkeepMetrics::global() {
                        metrics.record_extraction_failure(group.as_str());
                    }
                    FieldMap::new()
                }
            };
            record = record.with_group(group, fields);
        }

        let counts = record.counts();
        info!(
            bookmarks = counts.bookmarks,
            content_controls = counts.content_controls,
            empty_fields = counts.empty_fields,
            placeholder_patterns = counts.placeholder_patterns,
            "Extracted {} fields from {file_path}",
            counts.total()
        );
        #[cfg(feature = "metrics")]
        if let Some(metrics) = crate::observability::FieldkeepMetrics::global() {
            metrics.record_extracted_fields(counts.total());
        }

        record
    }
}
