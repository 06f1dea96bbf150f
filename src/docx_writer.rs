//! Flowing (DOCX) document output
//!
//! Renders translated text as a minimal OOXML package: one paragraph per
//! `\n`-delimited input unit, in order, with a uniform font size. Empty
//! lines are kept as empty paragraphs so the output mirrors the source line
//! structure. No pagination or width measurement happens here; the format
//! reflows when opened.

use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::Result;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Writes translated text into a reflowable DOCX package
pub struct FlowingDocumentWriter {
    /// Uniform font size in points, applied to every run
    pub font_size: f32,
}

impl FlowingDocumentWriter {
    pub fn new(font_size: f32) -> Self {
        Self { font_size }
    }

    /// Produce DOCX bytes with one paragraph block per input line
    pub fn write(&self, text: &str) -> Result<Vec<u8>> {
        let document_xml = self.build_document_xml(text)?;

        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        archive.start_file("[Content_Types].xml", options)?;
        archive.write_all(CONTENT_TYPES_XML.as_bytes())?;
        archive.start_file("_rels/.rels", options)?;
        archive.write_all(ROOT_RELS_XML.as_bytes())?;
        archive.start_file("word/document.xml", options)?;
        archive.write_all(&document_xml)?;

        let bytes = archive.finish()?.into_inner();
        debug!("flowing document packaged ({} bytes)", bytes.len());
        Ok(bytes)
    }

    /// Build word/document.xml with one `<w:p>` per line
    fn build_document_xml(&self, text: &str) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut document = BytesStart::new("w:document");
        document.push_attribute(("xmlns:w", WORDML_NS));
        writer.write_event(Event::Start(document))?;
        writer.write_event(Event::Start(BytesStart::new("w:body")))?;

        // Half-point units, per WordprocessingML.
        let half_points = ((self.font_size * 2.0).round() as i64).to_string();

        for line in text.split('\n') {
            if line.is_empty() {
                // Preserved: empty lines stay as empty paragraph blocks.
                writer.write_event(Event::Empty(BytesStart::new("w:p")))?;
                continue;
            }

            writer.write_event(Event::Start(BytesStart::new("w:p")))?;
            writer.write_event(Event::Start(BytesStart::new("w:r")))?;

            writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
            let mut sz = BytesStart::new("w:sz");
            sz.push_attribute(("w:val", half_points.as_str()));
            writer.write_event(Event::Empty(sz))?;
            let mut sz_cs = BytesStart::new("w:szCs");
            sz_cs.push_attribute(("w:val", half_points.as_str()));
            writer.write_event(Event::Empty(sz_cs))?;
            writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;

            let mut text_el = BytesStart::new("w:t");
            text_el.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(text_el))?;
            writer.write_event(Event::Text(BytesText::new(line)))?;
            writer.write_event(Event::End(BytesEnd::new("w:t")))?;

            writer.write_event(Event::End(BytesEnd::new("w:r")))?;
            writer.write_event(Event::End(BytesEnd::new("w:p")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("w:body")))?;
        writer.write_event(Event::End(BytesEnd::new("w:document")))?;
        Ok(writer.into_inner().into_inner())
    }
}
