//! Builders for small WordprocessingML packages used by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Body markup accumulated block by block.
#[derive(Default)]
pub struct DocBuilder {
    blocks: Vec<String>,
}

impl DocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.blocks.push(format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    /// Paragraph holding `label` followed by a bookmark around `value`.
    pub fn bookmark(mut self, id: u32, name: &str, label: &str, value: &str) -> Self {
        self.blocks.push(format!(
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">{label}</w:t></w:r>"#,
                r#"<w:bookmarkStart w:id="{id}" w:name="{name}"/>"#,
                r#"<w:r><w:t>{value}</w:t></w:r><w:bookmarkEnd w:id="{id}"/></w:p>"#
            ),
            label = escape(label),
            id = id,
            name = name,
            value = escape(value)
        ));
        self
    }

    pub fn content_control(mut self, tag: Option<&str>, alias: Option<&str>, value: &str) -> Self {
        let mut properties = String::new();
        if let Some(alias) = alias {
            properties.push_str(&format!(r#"<w:alias w:val="{}"/>"#, escape(alias)));
        }
        if let Some(tag) = tag {
            properties.push_str(&format!(r#"<w:tag w:val="{}"/>"#, escape(tag)));
        }
        self.blocks.push(format!(
            concat!(
                r#"<w:sdt><w:sdtPr>{properties}</w:sdtPr><w:sdtContent>"#,
                r#"<w:p><w:r><w:t>{value}</w:t></w:r></w:p></w:sdtContent></w:sdt>"#
            ),
            properties = properties,
            value = escape(value)
        ));
        self
    }

    /// Raw block markup, inserted as given.
    pub fn raw(mut self, markup: &str) -> Self {
        self.blocks.push(markup.to_string());
        self
    }

    pub fn document_xml(&self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                r#"<w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
            ),
            self.blocks.concat()
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        writer.start_file("_rels/.rels", options).unwrap();
        writer.write_all(RELS.as_bytes()).unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(self.document_xml().as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Raw bytes of one part of a package on disk.
pub fn read_part(path: &Path, name: &str) -> String {
    use std::io::Read;

    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut content = String::new();
    part.read_to_string(&mut content).unwrap();
    content
}
