/*!
Field restoration.

The restorer fills empty labelled slots in a target document with the values of
a [`BackupRecord`], then appends the reference table. Slots are located by the
[`SlotStrategy`] list; each strategy is a pure function from paragraph text and
field name to the span to replace.
*/

use crate::document::{DocumentContainer, DocxDocument};
use crate::record::BackupRecord;
use crate::reporter::ReferenceReporter;
use crate::{FieldkeepError, Result};
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ways of recognising an unfilled slot for a field, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStrategy {
    /// `Name:` followed by three or more blanks.
    LabelGap,
    /// `Name :` with at most one blank before the colon, then three or more blanks.
    SpacedLabelGap,
    /// `Name:` closing the paragraph.
    TrailingLabel,
}

impl SlotStrategy {
    pub const ORDERED: [SlotStrategy; 3] = [
        SlotStrategy::LabelGap,
        SlotStrategy::SpacedLabelGap,
        SlotStrategy::TrailingLabel,
    ];

    /// Case-insensitive pattern for `name`, which is matched literally.
    pub fn pattern(&self, name: &str) -> String {
        let name = regex::escape(name);
        match self {
            SlotStrategy::LabelGap => format!(r"(?i){name}:\s{{3,}}"),
            SlotStrategy::SpacedLabelGap => format!(r"(?i){name}\s?:\s{{3,}}"),
            SlotStrategy::TrailingLabel => format!(r"(?i)\b{name}\b\s*:\s*$"),
        }
    }

    pub fn compile(&self, name: &str) -> Result<Regex> {
        Regex::new(&self.pattern(name)).map_err(|e| {
            FieldkeepError::restore(format!("cannot build slot pattern for '{name}': {e}"))
        })
    }

    /// Byte span of the first slot for `name` in `text`.
    pub fn find(&self, text: &str, name: &str) -> Option<Range<usize>> {
        self.compile(name).ok()?.find(text).map(|m| m.range())
    }
}

/// Precompiled slot patterns and replacement for one candidate field.
#[derive(Debug, Clone)]
pub struct SlotMatcher {
    name: String,
    value: String,
    patterns: Vec<(SlotStrategy, Regex)>,
}

impl SlotMatcher {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Result<Self> {
        let name = name.into();
        let patterns = SlotStrategy::ORDERED
            .iter()
            .map(|strategy| Ok((*strategy, strategy.compile(&name)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name,
            value: value.into(),
            patterns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First strategy with a slot in `text`, and that slot's span.
    pub fn find(&self, text: &str) -> Option<(SlotStrategy, Range<usize>)> {
        self.patterns
            .iter()
            .find_map(|(strategy, regex)| regex.find(text).map(|m| (*strategy, m.range())))
    }

    /// `text` with its first slot replaced by `name: value`, if it has one.
    pub fn fill(&self, text: &str) -> Option<String> {
        let (strategy, span) = self.find(text)?;
        debug!(field = %self.name, ?strategy, "Slot filled");
        let mut filled = String::with_capacity(text.len() + self.value.len());
        filled.push_str(&text[..span.start]);
        filled.push_str(&self.name);
        filled.push_str(": ");
        filled.push_str(&self.value);
        filled.push_str(&text[span.end..]);
        Some(filled)
    }
}

/// Candidate fields that found no slot in the target.
///
/// Not an error: their values are still listed in the reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialRestoreWarning {
    pub unmatched: Vec<String>,
}

impl fmt::Display for PartialRestoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} field(s) found no matching slot: {}",
            self.unmatched.len(),
            self.unmatched.join(", ")
        )
    }
}

/// Outcome of one restoration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Slots filled inline, counted per (paragraph, field) pair.
    pub restored: usize,
    /// Rows in the appended reference table.
    pub reference_rows: usize,
    /// Candidate names that were never placed.
    pub unmatched: Vec<String>,
    /// Where the restored document was written.
    pub output_path: Option<PathBuf>,
}

impl RestoreReport {
    pub fn warning(&self) -> Option<PartialRestoreWarning> {
        if self.unmatched.is_empty() {
            None
        } else {
            Some(PartialRestoreWarning {
                unmatched: self.unmatched.clone(),
            })
        }
    }
}

/// Writes backed-up values into target documents.
#[derive(Debug, Clone, Default)]
pub struct FieldRestorer {
    reporter: ReferenceReporter,
}

impl FieldRestorer {
    pub fn new(reporter: ReferenceReporter) -> Self {
        Self { reporter }
    }

    /// Restore `record` into the document at `target` and write the result to
    /// `output`. The target file itself is never modified.
    ///
    /// # Errors
    /// * `FieldkeepError::Restore` - if `output` is the target, the target is
    ///   missing or unreadable, or the output cannot be written
    pub fn restore<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        record: &BackupRecord,
        target: P,
        output: Q,
    ) -> Result<RestoreReport> {
        let target = target.as_ref();
        let output = output.as_ref();
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        if same_file(target, output) {
            return Err(FieldkeepError::restore(format!(
                "output {} must differ from the target document",
                output.display()
            )));
        }
        if !target.is_file() {
            return Err(FieldkeepError::restore(format!(
                "target document not found: {}",
                target.display()
            )));
        }

        info!("Restoring {} fields into {}", record.total_fields(), target.display());
        let mut document = DocxDocument::open(target).map_err(|e| {
            FieldkeepError::restore(format!("cannot open target {}: {e}", target.display()))
        })?;

        let mut report = self.restore_document(record, &mut document)?;

        document.save(output).map_err(|e| {
            FieldkeepError::restore(format!("cannot write output {}: {e}", output.display()))
        })?;
        report.output_path = Some(output.to_path_buf());

        #[cfg(feature = "metrics")]
        if let Some(metrics) = crate::observability::FieldkeepMetrics::global() {
            metrics.record_restore_latency(started.elapsed());
        }
        info!(
            restored = report.restored,
            reference_rows = report.reference_rows,
            "Restored document written to {}",
            output.display()
        );
        Ok(report)
    }

    /// Fill slots in an open document and append the reference table.
    pub fn restore_document(
        &self,
        record: &BackupRecord,
        document: &mut dyn DocumentContainer,
    ) -> Result<RestoreReport> {
        let (restored, unmatched) = self.fill_slots(record, document)?;

        let reference_rows = match self.reporter.append(record, document) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not append reference table: {e}");
                0
            }
        };

        Ok(RestoreReport {
            restored,
            reference_rows,
            unmatched,
            output_path: None,
        })
    }

    /// Inline pass only: returns the fill count and the unmatched names.
    pub fn fill_slots(
        &self,
        record: &BackupRecord,
        document: &mut dyn DocumentContainer,
    ) -> Result<(usize, Vec<String>)> {
        let matchers = record
            .restoration_candidates()
            .into_iter()
            .map(|(name, value)| SlotMatcher::new(name, value))
            .collect::<Result<Vec<_>>>()?;

        let paragraphs = document
            .paragraphs()
            .map_err(|e| FieldkeepError::restore(format!("cannot read target paragraphs: {e}")))?;

        let mut hits = vec![0usize; matchers.len()];
        let mut restored = 0;
        for (index, original) in paragraphs.iter().enumerate() {
            let mut text = original.clone();
            for (matcher, count) in matchers.iter().zip(hits.iter_mut()) {
                if let Some(filled) = matcher.fill(&text) {
                    text = filled;
                    *count += 1;
                    restored += 1;
                }
            }
            if text != *original {
                document.set_paragraph_text(index, &text).map_err(|e| {
                    FieldkeepError::restore(format!("cannot update paragraph {index}: {e}"))
                })?;
            }
        }

        let unmatched: Vec<String> = matchers
            .iter()
            .zip(&hits)
            .filter(|(_, count)| **count == 0)
            .map(|(matcher, _)| matcher.name().to_string())
            .collect();

        if !unmatched.is_empty() {
            let warning = PartialRestoreWarning {
                unmatched: unmatched.clone(),
            };
            warn!("{warning}");
        }
        #[cfg(feature = "metrics")]
        if let Some(metrics) = crate::observability::FieldkeepMetrics::global() {
            metrics.record_restored_slots(restored);
            metrics.record_unmatched_fields(unmatched.len());
        }

        Ok((restored, unmatched))
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
