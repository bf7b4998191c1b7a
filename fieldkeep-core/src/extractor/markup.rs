//! Strategies that read the raw body markup: bookmarks and content controls.

use super::ExtractionStrategy;
use crate::document::{DocumentContainer, MAIN_PART};
use crate::field::Field;
use crate::record::{FieldGroup, FieldMap};
use crate::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

/// Bookmark names with this prefix are generated by the editor (`_GoBack`, `_Toc…`).
const RESERVED_PREFIX: char = '_';

/// Named start/end marker pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookmarkStrategy;

impl ExtractionStrategy for BookmarkStrategy {
    fn group(&self) -> FieldGroup {
        FieldGroup::Bookmarks
    }

    fn extract(&self, source: &dyn DocumentContainer) -> Result<FieldMap> {
        extract_bookmarks(&source.read_part(MAIN_PART)?)
    }
}

/// Structured tagged containers (`w:sdt`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentControlStrategy;

impl ExtractionStrategy for ContentControlStrategy {
    fn group(&self) -> FieldGroup {
        FieldGroup::ContentControls
    }

    fn extract(&self, source: &dyn DocumentContainer) -> Result<FieldMap> {
        extract_content_controls(&source.read_part(MAIN_PART)?)
    }
}

struct BookmarkWindow {
    order: usize,
    id: String,
    name: String,
    text: String,
}

/// Collect the text enclosed by each bookmark.
///
/// A window opens at `w:bookmarkStart` and closes at the `w:bookmarkEnd` with the
/// same id; a window never closed runs to the end of the document. When two
/// bookmarks share a name the one that starts later wins.
pub fn extract_bookmarks(markup: &str) -> Result<FieldMap> {
    let mut reader = Reader::from_str(markup);
    let mut open: Vec<BookmarkWindow> = Vec::new();
    let mut finished: Vec<BookmarkWindow> = Vec::new();
    let mut started = 0usize;
    let mut in_text = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(t) if in_text && !open.is_empty() => {
                let text = t.unescape()?;
                for window in open.iter_mut() {
                    window.text.push_str(&text);
                }
            }
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"w:bookmarkStart" => {
                    let name = attribute(e, b"w:name")?.unwrap_or_default();
                    if name.is_empty() || name.starts_with(RESERVED_PREFIX) {
                        continue;
                    }
                    let Some(id) = attribute(e, b"w:id")? else {
                        warn!("Skipping bookmark '{name}' without an id");
                        continue;
                    };
                    open.push(BookmarkWindow {
                        order: started,
                        id,
                        name,
                        text: String::new(),
                    });
                    started += 1;
                }
                b"w:bookmarkEnd" => {
                    if let Some(id) = attribute(e, b"w:id")? {
                        let (closed, still_open): (Vec<_>, Vec<_>) =
                            open.into_iter().partition(|window| window.id == id);
                        finished.extend(closed);
                        open = still_open;
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    if !open.is_empty() {
        debug!("{} bookmark(s) never closed; read to end of document", open.len());
    }
    finished.extend(open);
    finished.sort_by_key(|window| window.order);

    Ok(finished
        .into_iter()
        .map(|window| {
            let field = Field::bookmark(window.name.as_str(), window.text.trim(), window.id);
            (window.name, field)
        })
        .collect())
}

#[derive(Default)]
struct ControlFrame {
    order: usize,
    depth: usize,
    has_properties: bool,
    in_properties: bool,
    in_content: bool,
    tag: Option<String>,
    alias: Option<String>,
    text: String,
}

/// Collect every content control in document order.
///
/// Key precedence is tag, then alias, then `content_control_<n>` counting the
/// controls that have neither. Controls without `w:sdtPr` are ignored. Nested
/// controls contribute their text to every enclosing control.
pub fn extract_content_controls(markup: &str) -> Result<FieldMap> {
    let mut reader = Reader::from_str(markup);
    let mut open: Vec<ControlFrame> = Vec::new();
    let mut finished: Vec<ControlFrame> = Vec::new();
    let mut started = 0usize;
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"w:sdt" => {
                        open.push(ControlFrame {
                            order: started,
                            depth,
                            ..ControlFrame::default()
                        });
                        started += 1;
                    }
                    b"w:t" => in_text = true,
                    _ => {
                        if let Some(frame) = open.last_mut() {
                            visit_control_child(frame, e, depth)?;
                        }
                    }
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if e.name().as_ref() == b"w:sdt" {
                    started += 1;
                } else if let Some(frame) = open.last_mut() {
                    visit_control_child(frame, e, depth)?;
                    if depth == frame.depth + 1 {
                        // Self-closing sdtPr/sdtContent have nothing inside.
                        frame.in_properties = false;
                        frame.in_content = false;
                    }
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = e.name();
                match name.as_ref() {
                    b"w:t" => in_text = false,
                    b"w:sdt" => {
                        if open.last().map(|frame| frame.depth) == Some(depth) {
                            if let Some(frame) = open.pop() {
                                finished.push(frame);
                            }
                        }
                    }
                    b"w:sdtPr" | b"w:sdtContent" => {
                        if let Some(frame) = open.last_mut() {
                            if depth == frame.depth + 1 {
                                frame.in_properties = false;
                                frame.in_content = false;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) if in_text => {
                if open.iter().any(|frame| frame.in_content) {
                    let text = t.unescape()?;
                    for frame in open.iter_mut().filter(|frame| frame.in_content) {
                        frame.text.push_str(&text);
                    }
                }
            }
            _ => {}
        }
    }

    finished.extend(open);
    finished.sort_by_key(|frame| frame.order);

    let mut fields = FieldMap::new();
    let mut unnamed = 0usize;
    for frame in finished.into_iter().filter(|frame| frame.has_properties) {
        let key = match non_empty(&frame.tag).or_else(|| non_empty(&frame.alias)) {
            Some(key) => key.to_string(),
            None => {
                unnamed += 1;
                format!("content_control_{unnamed}")
            }
        };
        let field = Field::content_control(key.as_str(), frame.text.trim(), frame.tag, frame.alias);
        fields.insert(key, field);
    }
    Ok(fields)
}

/// Track `w:sdtPr`/`w:sdtContent` of the innermost control and read its tag and alias.
fn visit_control_child(frame: &mut ControlFrame, e: &BytesStart, depth: usize) -> Result<()> {
    if depth == frame.depth + 1 {
        match e.name().as_ref() {
            b"w:sdtPr" => {
                frame.has_properties = true;
                frame.in_properties = true;
            }
            b"w:sdtContent" => frame.in_content = true,
            _ => {}
        }
    } else if frame.in_properties && depth == frame.depth + 2 {
        match e.name().as_ref() {
            b"w:tag" => frame.tag = attribute(e, b"w:val")?,
            b"w:alias" => frame.alias = attribute(e, b"w:val")?,
            _ => {}
        }
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Decoded value of one attribute; a malformed attribute fails the whole pass.
fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOrigin;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="urn:w"><w:body>{body}</w:body></w:document>"#
        )
    }

    #[test]
    fn test_bookmark_text_is_collected_and_trimmed() {
        let markup = wrap(concat!(
            r#"<w:p><w:r><w:t>PO: </w:t></w:r><w:bookmarkStart w:id="0" w:name="PO_NUMBER"/>"#,
            r#"<w:r><w:t xml:space="preserve"> 123</w:t></w:r><w:r><w:t>45 </w:t></w:r>"#,
            r#"<w:bookmarkEnd w:id="0"/><w:r><w:t>after</w:t></w:r></w:p>"#
        ));
        let fields = extract_bookmarks(&markup).unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["PO_NUMBER"], Field::bookmark("PO_NUMBER", "12345", "0"));
    }

    #[test]
    fn test_reserved_and_unnamed_bookmarks_are_skipped() {
        let markup = wrap(concat!(
            r#"<w:bookmarkStart w:id="1" w:name="_GoBack"/><w:bookmarkEnd w:id="1"/>"#,
            r#"<w:bookmarkStart w:id="2" w:name=""/><w:bookmarkEnd w:id="2"/>"#,
            r#"<w:bookmarkStart w:id="3" w:name="Client"/><w:p><w:r><w:t>ACME</w:t></w:r></w:p><w:bookmarkEnd w:id="3"/>"#
        ));
        let fields = extract_bookmarks(&markup).unwrap();

        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Client"]);
        assert_eq!(fields["Client"].value, "ACME");
    }

    #[test]
    fn test_unclosed_bookmark_reads_to_end() {
        let markup = wrap(concat!(
            r#"<w:p><w:bookmarkStart w:id="5" w:name="Tail"/><w:r><w:t>one</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>two</w:t></w:r></w:p>"#
        ));
        let fields = extract_bookmarks(&markup).unwrap();
        assert_eq!(fields["Tail"].value, "onetwo");
    }

    #[test]
    fn test_overlapping_bookmarks_each_get_their_text() {
        let markup = wrap(concat!(
            r#"<w:bookmarkStart w:id="1" w:name="Outer"/><w:r><w:t>a</w:t></w:r>"#,
            r#"<w:bookmarkStart w:id="2" w:name="Inner"/><w:r><w:t>b</w:t></w:r>"#,
            r#"<w:bookmarkEnd w:id="2"/><w:r><w:t>c</w:t></w:r><w:bookmarkEnd w:id="1"/>"#
        ));
        let fields = extract_bookmarks(&markup).unwrap();

        assert_eq!(fields["Outer"].value, "abc");
        assert_eq!(fields["Inner"].value, "b");
    }

    #[test]
    fn test_duplicate_bookmark_name_keeps_later_start() {
        let markup = wrap(concat!(
            r#"<w:bookmarkStart w:id="1" w:name="Dup"/><w:r><w:t>first</w:t></w:r><w:bookmarkEnd w:id="1"/>"#,
            r#"<w:bookmarkStart w:id="2" w:name="Dup"/><w:r><w:t>second</w:t></w:r><w:bookmarkEnd w:id="2"/>"#
        ));
        let fields = extract_bookmarks(&markup).unwrap();
        assert_eq!(fields["Dup"], Field::bookmark("Dup", "second", "2"));
    }

    #[test]
    fn test_malformed_bookmark_attribute_fails_the_pass() {
        let markup = wrap(r#"<w:bookmarkStart w:id="1" w:name="Bad&bogus;"/><w:bookmarkEnd w:id="1"/>"#);
        assert!(extract_bookmarks(&markup).is_err());
        // The same markup does not trouble the content control pass.
        assert!(extract_content_controls(&markup).unwrap().is_empty());
    }

    #[test]
    fn test_content_control_key_precedence() {
        let markup = wrap(concat!(
            r#"<w:sdt><w:sdtPr><w:alias w:val="Client Name"/><w:tag w:val="client"/></w:sdtPr>"#,
            r#"<w:sdtContent><w:r><w:t> ACME </w:t></w:r></w:sdtContent></w:sdt>"#,
            r#"<w:sdt><w:sdtPr><w:alias w:val="Invoice Date"/></w:sdtPr>"#,
            r#"<w:sdtContent><w:r><w:t>2024-01-01</w:t></w:r></w:sdtContent></w:sdt>"#,
            r#"<w:sdt><w:sdtPr><w:id w:val="9"/></w:sdtPr><w:sdtContent><w:r><w:t>x</w:t></w:r></w:sdtContent></w:sdt>"#,
            r#"<w:sdt><w:sdtPr><w:tag w:val=""/></w:sdtPr><w:sdtContent><w:r><w:t>y</w:t></w:r></w:sdtContent></w:sdt>"#
        ));
        let fields = extract_content_controls(&markup).unwrap();

        assert_eq!(
            fields["client"],
            Field::content_control("client", "ACME", Some("client".into()), Some("Client Name".into()))
        );
        assert_eq!(fields["Invoice Date"].value, "2024-01-01");
        assert_eq!(fields["content_control_1"].value, "x");
        assert_eq!(
            fields["content_control_2"].origin,
            FieldOrigin::ContentControl {
                tag: Some(String::new()),
                alias: None
            }
        );
    }

    #[test]
    fn test_content_control_without_properties_is_ignored() {
        let markup = wrap(r#"<w:sdt><w:sdtContent><w:r><w:t>z</w:t></w:r></w:sdtContent></w:sdt>"#);
        assert!(extract_content_controls(&markup).unwrap().is_empty());
    }

    #[test]
    fn test_nested_content_controls() {
        let markup = wrap(concat!(
            r#"<w:sdt><w:sdtPr><w:tag w:val="outer"/></w:sdtPr><w:sdtContent>"#,
            r#"<w:r><w:t>A </w:t></w:r>"#,
            r#"<w:sdt><w:sdtPr><w:tag w:val="inner"/></w:sdtPr><w:sdtContent><w:r><w:t>B</w:t></w:r></w:sdtContent></w:sdt>"#,
            r#"</w:sdtContent></w:sdt>"#
        ));
        let fields = extract_content_controls(&markup).unwrap();

        assert_eq!(fields["outer"].value, "A B");
        assert_eq!(fields["inner"].value, "B");
    }

    #[test]
    fn test_tag_inside_content_is_not_a_key() {
        let markup = wrap(concat!(
            r#"<w:sdt><w:sdtPr/><w:sdtContent><w:p><w:tag w:val="stray"/>"#,
            r#"<w:r><w:t>v</w:t></w:r></w:p></w:sdtContent></w:sdt>"#
        ));
        let fields = extract_content_controls(&markup).unwrap();
        assert_eq!(fields["content_control_1"].value, "v");
    }
}
