/*!
Field value objects: one recovered annotation each.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual fill-in conventions recognised by placeholder extraction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderFamily {
    /// `[text]`
    Bracket,
    /// `{text}`
    Brace,
    /// `<<text>>`
    DoubleAngle,
    /// `{{text}}`
    DoubleBrace,
    /// `${text}`
    DollarBrace,
}

impl PlaceholderFamily {
    /// All families in extraction order.
    pub const ALL: [PlaceholderFamily; 5] = [
        PlaceholderFamily::Bracket,
        PlaceholderFamily::Brace,
        PlaceholderFamily::DoubleAngle,
        PlaceholderFamily::DoubleBrace,
        PlaceholderFamily::DollarBrace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderFamily::Bracket => "bracket",
            PlaceholderFamily::Brace => "brace",
            PlaceholderFamily::DoubleAngle => "double_angle",
            PlaceholderFamily::DoubleBrace => "double_brace",
            PlaceholderFamily::DollarBrace => "dollar_brace",
        }
    }

    /// Regex with the placeholder text in capture group 1.
    pub fn pattern(&self) -> &'static str {
        match self {
            PlaceholderFamily::Bracket => r"\[([^\]]+)\]",
            PlaceholderFamily::Brace => r"\{([^}]+)\}",
            PlaceholderFamily::DoubleAngle => r"<<([^>]+)>>",
            PlaceholderFamily::DoubleBrace => r"\{\{([^}]+)\}\}",
            PlaceholderFamily::DollarBrace => r"\$\{([^}]+)\}",
        }
    }
}

impl fmt::Display for PlaceholderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label shapes that mark an expected but blank value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelPattern {
    /// A single word, a colon and a run of blanks.
    #[serde(rename = "label_with_spaces")]
    LabelWithSpaces,
    /// Two words, a colon and a run of blanks.
    #[serde(rename = "two_word_label")]
    TwoWordLabel,
    /// Letters including the Latin-1 and Vietnamese accented range.
    #[serde(rename = "vietnamese_label")]
    AccentedLabel,
}

impl LabelPattern {
    /// All label patterns in extraction order.
    pub const ALL: [LabelPattern; 3] = [
        LabelPattern::LabelWithSpaces,
        LabelPattern::TwoWordLabel,
        LabelPattern::AccentedLabel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelPattern::LabelWithSpaces => "label_with_spaces",
            LabelPattern::TwoWordLabel => "two_word_label",
            LabelPattern::AccentedLabel => "vietnamese_label",
        }
    }

    /// Regex with the label in capture group 1.
    pub fn pattern(&self) -> &'static str {
        match self {
            LabelPattern::LabelWithSpaces => r"(\w+):\s{3,}",
            LabelPattern::TwoWordLabel => r"(\w+\s+\w+):\s{3,}",
            LabelPattern::AccentedLabel => r"([A-Za-zÀ-ỹ\s]+):\s{3,}",
        }
    }
}

impl fmt::Display for LabelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a recovered field, without its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bookmark,
    ContentControl,
    Placeholder,
    EmptyField,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bookmark => "bookmark",
            FieldKind::ContentControl => "content_control",
            FieldKind::Placeholder => "placeholder",
            FieldKind::EmptyField => "empty_field",
        };
        f.write_str(name)
    }
}

/// Kind-specific metadata, serialized with a `type` discriminator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldOrigin {
    Bookmark {
        id: String,
    },
    ContentControl {
        tag: Option<String>,
        alias: Option<String>,
    },
    Placeholder {
        pattern_type: PlaceholderFamily,
    },
    EmptyField {
        pattern_type: LabelPattern,
    },
}

/// One recovered annotation.
///
/// Serializes to the flat backup shape, e.g.
/// `{"name": "PO_NUMBER", "value": "12345", "id": "0", "type": "bookmark"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    #[serde(flatten)]
    pub origin: FieldOrigin,
}

impl Field {
    pub fn bookmark<N, V, I>(name: N, value: V, id: I) -> Self
    where
        N: Into<String>,
        V: Into<String>,
        I: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
            origin: FieldOrigin::Bookmark { id: id.into() },
        }
    }

    pub fn content_control<N, V>(
        name: N,
        value: V,
        tag: Option<String>,
        alias: Option<String>,
    ) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
            origin: FieldOrigin::ContentControl { tag, alias },
        }
    }

    /// `name` is the placeholder text, `raw_span` the full matched text.
    pub fn placeholder<N, R>(name: N, raw_span: R, family: PlaceholderFamily) -> Self
    where
        N: Into<String>,
        R: Into<String>,
    {
        Self {
            name: name.into(),
            value: raw_span.into(),
            origin: FieldOrigin::Placeholder {
                pattern_type: family,
            },
        }
    }

    pub fn empty<N: Into<String>>(label: N, pattern: LabelPattern) -> Self {
        Self {
            name: label.into(),
            value: String::new(),
            origin: FieldOrigin::EmptyField {
                pattern_type: pattern,
            },
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self.origin {
            FieldOrigin::Bookmark { .. } => FieldKind::Bookmark,
            FieldOrigin::ContentControl { .. } => FieldKind::ContentControl,
            FieldOrigin::Placeholder { .. } => FieldKind::Placeholder,
            FieldOrigin::EmptyField { .. } => FieldKind::EmptyField,
        }
    }

    /// Whitespace-only values count as empty.
    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// Matched source text for placeholder fields.
    pub fn raw_span(&self) -> Option<&str> {
        match self.origin {
            FieldOrigin::Placeholder { .. } => Some(&self.value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_serializes_to_flat_shape() {
        let field = Field::bookmark("PO_NUMBER", "12345", "7");
        let json = serde_json::to_value(&field).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"name": "PO_NUMBER", "value": "12345", "id": "7", "type": "bookmark"})
        );
    }

    #[test]
    fn test_content_control_keeps_null_metadata() {
        let field = Field::content_control("Client", "ACME", None, Some("Client".into()));
        let json = serde_json::to_value(&field).unwrap();

        assert_eq!(json["type"], "content_control");
        assert!(json["tag"].is_null());
        assert_eq!(json["alias"], "Client");

        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_content_control_missing_metadata_defaults_to_none() {
        let json = r#"{"name": "x", "value": "y", "type": "content_control"}"#;
        let field: Field = serde_json::from_str(json).unwrap();

        assert_eq!(
            field.origin,
            FieldOrigin::ContentControl {
                tag: None,
                alias: None
            }
        );
    }

    #[test]
    fn test_pattern_types_use_backup_names() {
        let placeholder = Field::placeholder("Date", "${Date}", PlaceholderFamily::DollarBrace);
        let json = serde_json::to_value(&placeholder).unwrap();
        assert_eq!(json["pattern_type"], "dollar_brace");
        assert_eq!(json["type"], "placeholder");

        let empty = Field::empty("Ngày ký", LabelPattern::AccentedLabel);
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["pattern_type"], "vietnamese_label");
        assert_eq!(json["value"], "");
    }

    #[test]
    fn test_kind_and_value_helpers() {
        let field = Field::placeholder("Date", "[Date]", PlaceholderFamily::Bracket);
        assert_eq!(field.kind(), FieldKind::Placeholder);
        assert_eq!(field.raw_span(), Some("[Date]"));
        assert!(field.has_value());

        let blank = Field::bookmark("Total", "   ", "1");
        assert_eq!(blank.kind(), FieldKind::Bookmark);
        assert!(!blank.has_value());
        assert_eq!(blank.raw_span(), None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"name": "x", "value": "y", "type": "form_field"}"#;
        assert!(serde_json::from_str::<Field>(json).is_err());
    }
}
