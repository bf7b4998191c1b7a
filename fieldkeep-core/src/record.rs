/*!
Backup record: the persisted snapshot of every field extracted from one source
document.
*/

use crate::field::{Field, FieldKind};
use crate::{FieldkeepError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Fields of one group, keyed by field key, in document order.
pub type FieldMap = IndexMap<String, Field>;

/// Timestamp layout without an offset, as older backups store it.
const NAIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// The four kind-groups of a backup record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Bookmarks,
    ContentControls,
    EmptyFields,
    PlaceholderPatterns,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 4] = [
        FieldGroup::Bookmarks,
        FieldGroup::ContentControls,
        FieldGroup::EmptyFields,
        FieldGroup::PlaceholderPatterns,
    ];

    /// Key of this group in the backup file.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldGroup::Bookmarks => "bookmarks",
            FieldGroup::ContentControls => "content_controls",
            FieldGroup::EmptyFields => "empty_fields",
            FieldGroup::PlaceholderPatterns => "placeholder_patterns",
        }
    }

    /// The only field kind allowed in this group.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldGroup::Bookmarks => FieldKind::Bookmark,
            FieldGroup::ContentControls => FieldKind::ContentControl,
            FieldGroup::EmptyFields => FieldKind::EmptyField,
            FieldGroup::PlaceholderPatterns => FieldKind::Placeholder,
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-group field counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCounts {
    pub bookmarks: usize,
    pub content_controls: usize,
    pub empty_fields: usize,
    pub placeholder_patterns: usize,
}

impl GroupCounts {
    pub fn total(&self) -> usize {
        self.bookmarks + self.content_controls + self.empty_fields + self.placeholder_patterns
    }
}

/// Snapshot of all fields recovered from one source document.
///
/// A record is built once by the extractor and never mutated afterwards; it can
/// be saved, loaded and passed read-only to any number of restorations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackupRecord {
    file_path: String,
    #[serde(deserialize_with = "deserialize_extraction_time")]
    extraction_time: DateTime<Utc>,
    #[serde(default)]
    bookmarks: FieldMap,
    #[serde(default)]
    content_controls: FieldMap,
    #[serde(default)]
    empty_fields: FieldMap,
    #[serde(default)]
    placeholder_patterns: FieldMap,
}

impl BackupRecord {
    /// Create an empty record for the given source document.
    pub fn new<S: Into<String>>(file_path: S, extraction_time: DateTime<Utc>) -> Self {
        Self {
            file_path: file_path.into(),
            extraction_time,
            bookmarks: FieldMap::new(),
            content_controls: FieldMap::new(),
            empty_fields: FieldMap::new(),
            placeholder_patterns: FieldMap::new(),
        }
    }

    /// Replace one group wholesale.
    pub fn with_group(mut self, group: FieldGroup, fields: FieldMap) -> Self {
        *self.group_slot(group) = fields;
        self
    }

    fn group_slot(&mut self, group: FieldGroup) -> &mut FieldMap {
        match group {
            FieldGroup::Bookmarks => &mut self.bookmarks,
            FieldGroup::ContentControls => &mut self.content_controls,
            FieldGroup::EmptyFields => &mut self.empty_fields,
            FieldGroup::PlaceholderPatterns => &mut self.placeholder_patterns,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn extraction_time(&self) -> DateTime<Utc> {
        self.extraction_time
    }

    pub fn group(&self, group: FieldGroup) -> &FieldMap {
        match group {
            FieldGroup::Bookmarks => &self.bookmarks,
            FieldGroup::ContentControls => &self.content_controls,
            FieldGroup::EmptyFields => &self.empty_fields,
            FieldGroup::PlaceholderPatterns => &self.placeholder_patterns,
        }
    }

    pub fn bookmarks(&self) -> &FieldMap {
        &self.bookmarks
    }

    pub fn content_controls(&self) -> &FieldMap {
        &self.content_controls
    }

    pub fn empty_fields(&self) -> &FieldMap {
        &self.empty_fields
    }

    pub fn placeholder_patterns(&self) -> &FieldMap {
        &self.placeholder_patterns
    }

    pub fn counts(&self) -> GroupCounts {
        GroupCounts {
            bookmarks: self.bookmarks.len(),
            content_controls: self.content_controls.len(),
            empty_fields: self.empty_fields.len(),
            placeholder_patterns: self.placeholder_patterns.len(),
        }
    }

    pub fn total_fields(&self) -> usize {
        self.counts().total()
    }

    /// Check that every field sits in the group of its kind.
    pub fn validate(&self) -> Result<()> {
        for group in FieldGroup::ALL {
            for (key, field) in self.group(group) {
                if field.kind() != group.kind() {
                    return Err(FieldkeepError::validation(format!(
                        "field '{key}' in {group} has type {}",
                        field.kind()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Values to reinsert into a target document, in lookup order.
    ///
    /// Bookmarks and content controls are keyed by field key, placeholders by
    /// their placeholder text. A later entry with an existing name replaces the
    /// value but keeps the original position.
    pub fn restoration_candidates(&self) -> Vec<(String, String)> {
        let keyed = self
            .bookmarks
            .iter()
            .chain(self.content_controls.iter())
            .filter(|(_, field)| field.has_value())
            .map(|(key, field)| (key.clone(), field.value.clone()));
        let placeholders = self
            .placeholder_patterns
            .values()
            .filter(|field| field.has_value())
            .map(|field| (field.name.clone(), field.value.clone()));

        merge_ordered(keyed.chain(placeholders))
    }

    /// Non-empty bookmark and content control values for the reference table.
    pub fn reference_entries(&self) -> Vec<(String, String)> {
        merge_ordered(
            self.bookmarks
                .iter()
                .chain(self.content_controls.iter())
                .filter(|(_, field)| field.has_value())
                .map(|(key, field)| (key.clone(), field.value.clone())),
        )
    }
}

/// Parse an extraction time as RFC 3339, falling back to a naive timestamp read as UTC.
pub fn parse_extraction_time(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, NAIVE_TIME_FORMAT)
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn deserialize_extraction_time<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_extraction_time(raw.trim()).map_err(serde::de::Error::custom)
}

fn merge_ordered<I>(entries: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut merged: Vec<(String, String)> = Vec::new();
    for (name, value) in entries {
        match merged.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => merged.push((name, value)),
        }
    }
    merged
}
