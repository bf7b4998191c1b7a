/*!
WordprocessingML (`.docx`) document adapter.

The package is read fully into memory. Every part except the main body is kept
as raw bytes and written back untouched; the body is held as a flat list of
XML events so edits can splice events without re-encoding the rest of the
markup.
*/

use super::{DocumentContainer, TextRun, MAIN_PART};
use crate::{FieldkeepError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// One entry of the zip package; `None` for directory entries.
#[derive(Debug, Clone)]
struct PackagePart {
    name: String,
    data: Option<Vec<u8>>,
}

/// Event range of one body-level paragraph, both ends inclusive.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

/// Positions of interest in the body event list.
#[derive(Debug)]
struct Layout {
    paragraphs: Vec<Span>,
    tables: Vec<Span>,
    /// Where appended blocks go: before the body-level `w:sectPr`, else before `</w:body>`.
    insert_at: usize,
}

/// A `.docx` package opened for reading and editing.
///
/// # Example
/// ```rust,no_run
/// use fieldkeep_core::document::{DocumentContainer, DocxDocument};
///
/// let mut doc = DocxDocument::open("converted.docx")?;
/// let paragraphs = doc.paragraphs()?;
/// doc.set_paragraph_text(0, "PO_NUMBER: 12345")?;
/// doc.save("converted_restored.docx")?;
/// # Ok::<(), fieldkeep_core::FieldkeepError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocxDocument {
    source: Option<PathBuf>,
    parts: Vec<PackagePart>,
    body: Vec<Event<'static>>,
}

impl DocxDocument {
    /// Open a package from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut document = Self::from_reader(file)?;
        document.source = Some(path.to_path_buf());
        debug!(
            "Opened {} ({} parts, {} body events)",
            path.display(),
            document.parts.len(),
            document.body.len()
        );
        Ok(document)
    }

    /// Read a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();
            if entry.is_dir() {
                parts.push(PackagePart { name, data: None });
                continue;
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            parts.push(PackagePart {
                name,
                data: Some(data),
            });
        }

        let main = parts
            .iter()
            .find(|part| part.name == MAIN_PART)
            .and_then(|part| part.data.as_deref())
            .ok_or_else(|| FieldkeepError::invalid_document(format!("missing part {MAIN_PART}")))?;
        let markup = std::str::from_utf8(main).map_err(|e| {
            FieldkeepError::invalid_document(format!("{MAIN_PART} is not valid UTF-8: {e}"))
        })?;
        let body = parse_events(markup)?;

        let document = Self {
            source: None,
            parts,
            body,
        };
        // Reject packages without a body up front rather than on first edit.
        document.layout()?;
        Ok(document)
    }

    /// Read a package held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Path the package was opened from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Cell text of every body-level table, row by row.
    pub fn tables(&self) -> Result<Vec<Vec<Vec<String>>>> {
        let layout = self.layout()?;
        layout
            .tables
            .iter()
            .map(|span| table_cells(&self.body[span.start..=span.end]))
            .collect()
    }

    /// Write the package to `path`.
    ///
    /// The file is written next to its destination and renamed into place, so a
    /// failed save never leaves a truncated document behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let body = self.serialize_body()?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut writer = ZipWriter::new(NamedTempFile::new_in(&directory)?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            match &part.data {
                None => writer.add_directory(part.name.as_str(), options)?,
                Some(data) => {
                    writer.start_file(part.name.as_str(), options)?;
                    if part.name == MAIN_PART {
                        writer.write_all(&body)?;
                    } else {
                        writer.write_all(data)?;
                    }
                }
            }
        }
        let temp = writer.finish()?;
        temp.persist(path).map_err(|e| FieldkeepError::Io(e.error))?;

        debug!("Saved {}", path.display());
        Ok(())
    }

    fn serialize_body(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.body {
            writer.write_event(event)?;
        }
        Ok(writer.into_inner())
    }

    fn layout(&self) -> Result<Layout> {
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut paragraphs = Vec::new();
        let mut tables = Vec::new();
        let mut open_block: Option<usize> = None;
        let mut section = None;
        let mut body_end = None;

        for (index, event) in self.body.iter().enumerate() {
            let in_body = stack.last().map(|name| name.as_slice()) == Some(b"w:body".as_slice());
            match event {
                Event::Start(e) => {
                    let name = e.name();
                    if in_body {
                        match name.as_ref() {
                            b"w:p" | b"w:tbl" => open_block = Some(index),
                            b"w:sectPr" => section = Some(index),
                            _ => {}
                        }
                    }
                    stack.push(name.as_ref().to_vec());
                }
                Event::Empty(e) if in_body => match e.name().as_ref() {
                    b"w:p" => paragraphs.push(Span {
                        start: index,
                        end: index,
                    }),
                    b"w:sectPr" => section = Some(index),
                    _ => {}
                },
                Event::End(e) => {
                    stack.pop();
                    let parent_is_body =
                        stack.last().map(|name| name.as_slice()) == Some(b"w:body".as_slice());
                    match e.name().as_ref() {
                        b"w:p" if parent_is_body => {
                            if let Some(start) = open_block.take() {
                                paragraphs.push(Span { start, end: index });
                            }
                        }
                        b"w:tbl" if parent_is_body => {
                            if let Some(start) = open_block.take() {
                                tables.push(Span { start, end: index });
                            }
                        }
                        b"w:body" => body_end = Some(index),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let insert_at = section
            .or(body_end)
            .ok_or_else(|| FieldkeepError::invalid_document("document has no w:body element"))?;
        Ok(Layout {
            paragraphs,
            tables,
            insert_at,
        })
    }

    fn append_block(&mut self, events: Vec<Event<'static>>) -> Result<()> {
        let at = self.layout()?.insert_at;
        self.body.splice(at..at, events);
        Ok(())
    }
}

impl DocumentContainer for DocxDocument {
    fn paragraphs(&self) -> Result<Vec<String>> {
        let layout = self.layout()?;
        layout
            .paragraphs
            .iter()
            .map(|span| paragraph_text(&self.body[span.start..=span.end]))
            .collect()
    }

    fn set_paragraph_text(&mut self, index: usize, text: &str) -> Result<()> {
        let layout = self.layout()?;
        let span = *layout.paragraphs.get(index).ok_or_else(|| {
            FieldkeepError::invalid_document(format!("no body paragraph at index {index}"))
        })?;
        let replacement = rewrite_paragraph(&self.body[span.start..=span.end], text);
        self.body.splice(span.start..=span.end, replacement);
        Ok(())
    }

    fn add_page_break(&mut self) -> Result<()> {
        let mut brk = BytesStart::new("w:br");
        brk.push_attribute(("w:type", "page"));
        self.append_block(vec![
            Event::Start(BytesStart::new("w:p")),
            Event::Start(BytesStart::new("w:r")),
            Event::Empty(brk),
            Event::End(BytesEnd::new("w:r")),
            Event::End(BytesEnd::new("w:p")),
        ])
    }

    fn add_heading(&mut self, text: &str, level: u8) -> Result<()> {
        let style = if level == 0 {
            "Title".to_string()
        } else {
            format!("Heading{level}")
        };
        let mut style_ref = BytesStart::new("w:pStyle");
        style_ref.push_attribute(("w:val", style.as_str()));

        let mut events = vec![
            Event::Start(BytesStart::new("w:p")),
            Event::Start(BytesStart::new("w:pPr")),
            Event::Empty(style_ref),
            Event::End(BytesEnd::new("w:pPr")),
        ];
        events.extend(run_events(&TextRun::plain(text)));
        events.push(Event::End(BytesEnd::new("w:p")));
        self.append_block(events)
    }

    fn add_table(&mut self, rows: &[Vec<String>], style: &str) -> Result<()> {
        self.append_block(table_events(rows, style))
    }

    fn add_paragraph(&mut self, runs: &[TextRun]) -> Result<()> {
        let mut events = vec![Event::Start(BytesStart::new("w:p"))];
        for run in runs {
            events.extend(run_events(run));
        }
        events.push(Event::End(BytesEnd::new("w:p")));
        self.append_block(events)
    }

    fn read_part(&self, name: &str) -> Result<String> {
        if name == MAIN_PART {
            let body = self.serialize_body()?;
            return String::from_utf8(body)
                .map_err(|e| FieldkeepError::invalid_document(format!("{name}: {e}")));
        }
        let data = self
            .parts
            .iter()
            .find(|part| part.name == name)
            .and_then(|part| part.data.clone())
            .ok_or_else(|| FieldkeepError::invalid_document(format!("part not found: {name}")))?;
        String::from_utf8(data).map_err(|e| FieldkeepError::invalid_document(format!("{name}: {e}")))
    }
}

fn parse_events(markup: &str) -> Result<Vec<Event<'static>>> {
    let markup = markup.strip_prefix('\u{feff}').unwrap_or(markup);
    let mut reader = Reader::from_str(markup);
    let mut events = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => events.push(event.into_owned()),
        }
    }
    Ok(events)
}

/// Visible text of a paragraph: `w:t` content, with tabs and breaks inside runs.
fn paragraph_text(events: &[Event<'static>]) -> Result<String> {
    let mut text = String::new();
    let mut in_text = false;
    let mut run_depth = 0usize;

    for event in events {
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:r" => run_depth += 1,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                _ => {}
            },
            Event::Text(t) if in_text => text.push_str(&t.unescape()?),
            Event::Empty(e) if run_depth > 0 => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" if is_line_break(e) => text.push('\n'),
                b"w:cr" => text.push('\n'),
                _ => {}
            },
            _ => {}
        }
    }
    Ok(text)
}

/// Page and column breaks carry no text; only wrapping breaks do.
fn is_line_break(e: &BytesStart) -> bool {
    match e.try_get_attribute("w:type") {
        Ok(Some(attr)) => attr.value.as_ref() == b"textWrapping",
        _ => true,
    }
}

/// Same paragraph with its properties kept and its content replaced by `text`.
fn rewrite_paragraph(events: &[Event<'static>], text: &str) -> Vec<Event<'static>> {
    let open = match &events[0] {
        Event::Start(e) | Event::Empty(e) => e.clone(),
        _ => BytesStart::new("w:p"),
    };
    let inner: &[Event<'static>] = if events.len() > 1 {
        &events[1..events.len() - 1]
    } else {
        &[]
    };

    let mut rewritten = vec![Event::Start(open)];
    let mut depth = 0usize;
    let mut in_props = false;
    for event in inner {
        match event {
            Event::Start(e) => {
                if depth == 0 && e.name().as_ref() == b"w:pPr" {
                    in_props = true;
                }
                if in_props {
                    rewritten.push(event.clone());
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if in_props {
                    rewritten.push(event.clone());
                    if depth == 0 {
                        in_props = false;
                    }
                }
            }
            Event::Empty(e) if depth == 0 && e.name().as_ref() == b"w:pPr" => {
                rewritten.push(event.clone());
            }
            other => {
                if in_props {
                    rewritten.push(other.clone());
                }
            }
        }
    }

    if !text.is_empty() {
        rewritten.extend(run_events(&TextRun::plain(text)));
    }
    rewritten.push(Event::End(BytesEnd::new("w:p")));
    rewritten
}

fn run_events(run: &TextRun) -> Vec<Event<'static>> {
    let mut events = vec![Event::Start(BytesStart::new("w:r"))];
    if run.bold {
        events.push(Event::Start(BytesStart::new("w:rPr")));
        events.push(Event::Empty(BytesStart::new("w:b")));
        events.push(Event::End(BytesEnd::new("w:rPr")));
    }

    let mut pending = String::new();
    for ch in run.text.chars() {
        match ch {
            '\t' => {
                flush_text(&mut events, &mut pending);
                events.push(Event::Empty(BytesStart::new("w:tab")));
            }
            '\n' | '\r' => {
                flush_text(&mut events, &mut pending);
                events.push(Event::Empty(BytesStart::new("w:br")));
            }
            _ => pending.push(ch),
        }
    }
    flush_text(&mut events, &mut pending);

    events.push(Event::End(BytesEnd::new("w:r")));
    events
}

fn flush_text(events: &mut Vec<Event<'static>>, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut open = BytesStart::new("w:t");
    open.push_attribute(("xml:space", "preserve"));
    events.push(Event::Start(open));
    events.push(Event::Text(BytesText::new(pending.as_str()).into_owned()));
    events.push(Event::End(BytesEnd::new("w:t")));
    pending.clear();
}

fn table_events(rows: &[Vec<String>], style: &str) -> Vec<Event<'static>> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut events = vec![
        Event::Start(BytesStart::new("w:tbl")),
        Event::Start(BytesStart::new("w:tblPr")),
    ];
    if !style.is_empty() {
        let mut style_ref = BytesStart::new("w:tblStyle");
        style_ref.push_attribute(("w:val", style));
        events.push(Event::Empty(style_ref));
    }
    events.push(Event::Empty(auto_width("w:tblW")));
    events.push(Event::End(BytesEnd::new("w:tblPr")));

    events.push(Event::Start(BytesStart::new("w:tblGrid")));
    for _ in 0..columns {
        events.push(Event::Empty(BytesStart::new("w:gridCol")));
    }
    events.push(Event::End(BytesEnd::new("w:tblGrid")));

    for row in rows {
        events.push(Event::Start(BytesStart::new("w:tr")));
        for column in 0..columns {
            events.push(Event::Start(BytesStart::new("w:tc")));
            events.push(Event::Start(BytesStart::new("w:tcPr")));
            events.push(Event::Empty(auto_width("w:tcW")));
            events.push(Event::End(BytesEnd::new("w:tcPr")));
            events.push(Event::Start(BytesStart::new("w:p")));
            match row.get(column) {
                Some(text) if !text.is_empty() => events.extend(run_events(&TextRun::plain(text.as_str()))),
                _ => {}
            }
            events.push(Event::End(BytesEnd::new("w:p")));
            events.push(Event::End(BytesEnd::new("w:tc")));
        }
        events.push(Event::End(BytesEnd::new("w:tr")));
    }

    events.push(Event::End(BytesEnd::new("w:tbl")));
    events
}

fn auto_width(name: &'static str) -> BytesStart<'static> {
    let mut width = BytesStart::new(name);
    width.push_attribute(("w:w", "0"));
    width.push_attribute(("w:type", "auto"));
    width
}

fn table_cells(events: &[Event<'static>]) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut table_depth = 0usize;
    let mut in_text = false;

    for event in events {
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => row.clear(),
                b"w:tc" if table_depth == 1 => cell.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:tr" if table_depth == 1 => rows.push(std::mem::take(&mut row)),
                b"w:tc" if table_depth == 1 => row.push(std::mem::take(&mut cell)),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => cell.push_str(&t.unescape()?),
            _ => {}
        }
    }
    Ok(rows)
}
