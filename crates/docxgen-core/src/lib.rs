//! Minimal .docx writer
//!
//! Emits the three mandatory Open XML parts (`[Content_Types].xml`,
//! `_rels/.rels` and `word/document.xml`) into a deflated zip archive.
//! Only headings and plain paragraphs are supported; this is a report
//! format, not a layout engine.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>
"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
"#;

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("xml write failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
enum Block {
    Heading(String),
    Paragraph(String),
}

/// Accumulates blocks and renders them into a .docx archive.
#[derive(Debug, Default)]
pub struct DocxBuilder {
    blocks: Vec<Block>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading(text.into()));
        self
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Render the archive bytes.
    pub fn build(&self) -> Result<Vec<u8>, DocxError> {
        let document = self.document_xml()?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS_XML.as_bytes())?;

        zip.start_file("word/document.xml", options)?;
        zip.write_all(&document)?;

        Ok(zip.finish()?.into_inner())
    }

    fn document_xml(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut document = BytesStart::new("w:document");
        document.push_attribute(("xmlns:w", WORDML_NS));
        writer.write_event(Event::Start(document))?;
        writer.write_event(Event::Start(BytesStart::new("w:body")))?;

        for block in &self.blocks {
            match block {
                Block::Heading(text) => write_paragraph(&mut writer, text, true)?,
                Block::Paragraph(text) => write_paragraph(&mut writer, text, false)?,
            }
        }

        writer.write_event(Event::Empty(BytesStart::new("w:sectPr")))?;
        writer.write_event(Event::End(BytesEnd::new("w:body")))?;
        writer.write_event(Event::End(BytesEnd::new("w:document")))?;

        Ok(writer.into_inner().into_inner())
    }
}

fn write_paragraph(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    text: &str,
    heading: bool,
) -> Result<(), DocxError> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;

    if heading {
        // Self-contained emphasis instead of a style reference, so no
        // styles.xml part is needed.
        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
        let mut size = BytesStart::new("w:sz");
        size.push_attribute(("w:val", "32"));
        writer.write_event(Event::Empty(size))?;
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
    }

    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;

    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry(archive: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn archive_contains_mandatory_parts() {
        let mut builder = DocxBuilder::new();
        builder.paragraph("hello");
        let bytes = builder.build().unwrap();

        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "_rels/.rels", "word/document.xml"]
        );
    }

    #[test]
    fn document_carries_text_in_runs() {
        let mut builder = DocxBuilder::new();
        builder.heading("URL report").paragraph("https://example.com");
        let bytes = builder.build().unwrap();

        let document = read_entry(&bytes, "word/document.xml");
        assert!(document.contains("URL report"));
        assert!(document.contains("https://example.com"));
        assert!(document.contains("<w:b/>"));
    }

    #[test]
    fn text_is_xml_escaped() {
        let mut builder = DocxBuilder::new();
        builder.paragraph("a < b & c > d");
        let bytes = builder.build().unwrap();

        let document = read_entry(&bytes, "word/document.xml");
        assert!(document.contains("a &lt; b &amp; c &gt; d"));
    }

    #[test]
    fn empty_builder_still_produces_valid_package() {
        let builder = DocxBuilder::new();
        assert!(builder.is_empty());
        let bytes = builder.build().unwrap();
        let document = read_entry(&bytes, "word/document.xml");
        assert!(document.contains("<w:body>"));
    }
}
