/*!
Document container abstraction.

The extractor and restorer only talk to documents through [`DocumentContainer`],
so the package format stays an adapter concern. [`DocxDocument`] is the
WordprocessingML implementation.
*/

pub mod docx;

use crate::Result;

pub use docx::DocxDocument;

/// Part holding the main document body.
pub const MAIN_PART: &str = "word/document.xml";

/// A run of text appended to a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
}

impl TextRun {
    pub fn plain<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

/// Read/write access to a structured document.
///
/// Paragraph indices refer to body-level paragraphs in document order and stay
/// stable across [`set_paragraph_text`](DocumentContainer::set_paragraph_text).
/// Every `add_*` call appends at the end of the body.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentContainer {
    /// Text of every body-level paragraph.
    fn paragraphs(&self) -> Result<Vec<String>>;

    /// Replace the runs of one paragraph with a single plain run.
    fn set_paragraph_text(&mut self, index: usize, text: &str) -> Result<()>;

    fn add_page_break(&mut self) -> Result<()>;

    fn add_heading(&mut self, text: &str, level: u8) -> Result<()>;

    /// Append a table; the first row is the header. An empty `style` means none.
    fn add_table(&mut self, rows: &[Vec<String>], style: &str) -> Result<()>;

    fn add_paragraph(&mut self, runs: &[TextRun]) -> Result<()>;

    /// Raw markup of a named package part.
    fn read_part(&self, name: &str) -> Result<String>;
}

/// Block appended to a [`MemoryDocument`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendedBlock {
    PageBreak,
    Heading(String, u8),
    Table { rows: Vec<Vec<String>>, style: String },
    Paragraph(Vec<TextRun>),
}

/// In-memory document for testing.
///
/// Paragraphs and parts are plain strings; appended content is recorded in
/// order so tests can inspect it.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pub paragraphs: Vec<String>,
    pub parts: std::collections::HashMap<String, String>,
    pub appended: Vec<AppendedBlock>,
}

#[cfg(test)]
impl MemoryDocument {
    pub fn with_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: paragraphs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_part<S: Into<String>>(mut self, name: &str, markup: S) -> Self {
        self.parts.insert(name.to_string(), markup.into());
        self
    }

    pub fn tables(&self) -> Vec<&Vec<Vec<String>>> {
        self.appended
            .iter()
            .filter_map(|block| match block {
                AppendedBlock::Table { rows, .. } => Some(rows),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl DocumentContainer for MemoryDocument {
    fn paragraphs(&self) -> Result<Vec<String>> {
        Ok(self.paragraphs.clone())
    }

    fn set_paragraph_text(&mut self, index: usize, text: &str) -> Result<()> {
        let slot = self.paragraphs.get_mut(index).ok_or_else(|| {
            crate::FieldkeepError::invalid_document(format!("no paragraph at index {index}"))
        })?;
        *slot = text.to_string();
        Ok(())
    }

    fn add_page_break(&mut self) -> Result<()> {
        self.appended.push(AppendedBlock::PageBreak);
        Ok(())
    }

    fn add_heading(&mut self, text: &str, level: u8) -> Result<()> {
        self.appended
            .push(AppendedBlock::Heading(text.to_string(), level));
        Ok(())
    }

    fn add_table(&mut self, rows: &[Vec<String>], style: &str) -> Result<()> {
        self.appended.push(AppendedBlock::Table {
            rows: rows.to_vec(),
            style: style.to_string(),
        });
        Ok(())
    }

    fn add_paragraph(&mut self, runs: &[TextRun]) -> Result<()> {
        self.appended.push(AppendedBlock::Paragraph(runs.to_vec()));
        Ok(())
    }

    fn read_part(&self, name: &str) -> Result<String> {
        self.parts.get(name).cloned().ok_or_else(|| {
            crate::FieldkeepError::invalid_document(format!("part not found: {name}"))
        })
    }
}
