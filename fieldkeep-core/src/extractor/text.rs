//! Strategies that scan the flattened paragraph text.

use super::ExtractionStrategy;
use crate::document::DocumentContainer;
use crate::field::{Field, LabelPattern, PlaceholderFamily};
use crate::record::{FieldGroup, FieldMap};
use crate::{FieldkeepError, Result};
use regex::Regex;
use tracing::trace;

/// Placeholder text shorter or longer than this is treated as prose.
pub const PLACEHOLDER_MIN_CHARS: usize = 2;
pub const PLACEHOLDER_MAX_CHARS: usize = 100;

/// Delimited placeholder spans such as `[Date]` or `{{client}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderStrategy;

impl ExtractionStrategy for PlaceholderStrategy {
    fn group(&self) -> FieldGroup {
        FieldGroup::PlaceholderPatterns
    }

    fn extract(&self, source: &dyn DocumentContainer) -> Result<FieldMap> {
        extract_placeholders(&joined_text(source)?)
    }
}

/// Labels followed by a run of blanks, e.g. `Name:      `.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFieldStrategy;

impl ExtractionStrategy for EmptyFieldStrategy {
    fn group(&self) -> FieldGroup {
        FieldGroup::EmptyFields
    }

    fn extract(&self, source: &dyn DocumentContainer) -> Result<FieldMap> {
        extract_empty_fields(&joined_text(source)?)
    }
}

/// All paragraph text joined by newlines.
pub fn joined_text(source: &dyn DocumentContainer) -> Result<String> {
    Ok(source.paragraphs()?.join("\n"))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| FieldkeepError::extraction(format!("invalid pattern {pattern}: {e}")))
}

/// Scan `text` with every placeholder family in turn.
///
/// Keys are `<family>_<name>` with spaces in the name replaced by underscores,
/// so the same name in two families yields two fields.
pub fn extract_placeholders(text: &str) -> Result<FieldMap> {
    let mut fields = FieldMap::new();
    for family in PlaceholderFamily::ALL {
        let regex = compile(family.pattern())?;
        for captures in regex.captures_iter(text) {
            let (Some(span), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let name = inner.as_str().trim();
            let length = name.chars().count();
            if !(PLACEHOLDER_MIN_CHARS..=PLACEHOLDER_MAX_CHARS).contains(&length) {
                trace!("Ignoring {family} span of {length} chars");
                continue;
            }
            let key = format!("{family}_{}", name.replace(' ', "_"));
            fields.insert(key, Field::placeholder(name, span.as_str(), family));
        }
    }
    Ok(fields)
}

/// Scan `text` for blank labelled fields.
///
/// One counter runs across all label patterns, so keys stay unique even when
/// several patterns match the same label.
pub fn extract_empty_fields(text: &str) -> Result<FieldMap> {
    let mut fields = FieldMap::new();
    let mut counter = 1usize;
    for pattern in LabelPattern::ALL {
        let regex = compile(pattern.pattern())?;
        for captures in regex.captures_iter(text) {
            let Some(label) = captures.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };
            if label.chars().count() <= 1 {
                continue;
            }
            let key = format!("empty_field_{counter}_{}", label.replace(' ', "_"));
            fields.insert(key, Field::empty(label, pattern));
            counter += 1;
        }
    }
    Ok(fields)
}
