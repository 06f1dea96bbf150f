//! Fixed-layout (PDF) document output
//!
//! Renders translated text into fixed-size pages: greedy word-wrap against
//! the measured line width, top-down cursor pagination, and font embedding
//! with a composite Type0 font for registered Unicode fonts or a built-in
//! Type1 font as the fallback. The cursor is owned by one render call and
//! never shared.

use log::{debug, info};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::config::PipelineOptions;
use crate::error::Result;
use crate::fonts::{FontRegistry, RegisteredFont};

/// Resource name every page uses for its active font
const FONT_RESOURCE: &str = "F1";

/// A wrapped line placed at a fixed position on a page
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// One laid-out page of placed lines
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub number: usize,
    pub lines: Vec<PlacedLine>,
}

/// Mutable per-render layout state
struct RenderCursor {
    page_number: usize,
    y: f32,
    margin: f32,
    line_height: f32,
    page_height: f32,
}

impl RenderCursor {
    fn new(options: &PipelineOptions) -> Self {
        Self {
            page_number: 1,
            y: options.page_height - options.margin,
            margin: options.margin,
            line_height: options.line_height,
            page_height: options.page_height,
        }
    }

    fn page_full(&self) -> bool {
        self.y < self.margin
    }

    fn advance_line(&mut self) {
        self.y -= self.line_height;
    }

    fn advance_gap(&mut self, gap: f32) {
        self.y -= gap;
    }

    fn start_new_page(&mut self) {
        self.page_number += 1;
        self.y = self.page_height - self.margin;
    }
}

/// Renders translated text into paginated PDF bytes
pub struct FixedLayoutRenderer<'a> {
    registry: &'a FontRegistry,
    options: PipelineOptions,
}

impl<'a> FixedLayoutRenderer<'a> {
    pub fn new(registry: &'a FontRegistry, options: PipelineOptions) -> Self {
        Self { registry, options }
    }

    /// Word-wrap and paginate `text`, measuring with the resolved font alias.
    ///
    /// Every returned line's measured width fits `width - 2*margin`, except
    /// a single word that alone exceeds the printable width; that word is
    /// placed as-is since it cannot be split further.
    pub fn layout(&self, text: &str, font_alias: &str) -> Vec<PageLayout> {
        let printable = self.options.printable_width();
        let mut cursor = RenderCursor::new(&self.options);
        let mut pages = vec![PageLayout {
            number: 1,
            lines: Vec::new(),
        }];

        for paragraph in text.split('\n') {
            for line in self.wrap_paragraph(paragraph, font_alias, printable) {
                if cursor.page_full() {
                    cursor.start_new_page();
                    pages.push(PageLayout {
                        number: cursor.page_number,
                        lines: Vec::new(),
                    });
                }
                pages
                    .last_mut()
                    .expect("at least one page")
                    .lines
                    .push(PlacedLine {
                        text: line,
                        x: self.options.margin,
                        y: cursor.y,
                    });
                cursor.advance_line();
            }
            cursor.advance_gap(self.options.paragraph_gap);
        }

        debug!(
            "laid out {} pages at {}x{}",
            pages.len(),
            self.options.page_width,
            self.options.page_height
        );
        pages
    }

    /// Greedy word wrap: words joined by single spaces until the next word
    /// would push the measured width past the printable limit.
    fn wrap_paragraph(&self, paragraph: &str, font_alias: &str, printable: f32) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            // An empty source line keeps its vertical slot.
            return vec![String::new()];
        }

        let size = self.options.font_size;
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in words {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if current.is_empty()
                || self.registry.text_width(font_alias, &candidate, size) <= printable
            {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    /// Lay out and serialize `text` into PDF bytes
    pub fn render(&self, text: &str, font_alias: &str) -> Result<Vec<u8>> {
        let pages = self.layout(text, font_alias);
        let active = self.registry.registered(font_alias);
        info!(
            "rendering {} pages with font '{}'{}",
            pages.len(),
            font_alias,
            if active.is_none() { " (built-in)" } else { "" }
        );

        let mut document = Document::new();
        let font_id = match &active {
            Some(registered) => add_unicode_font(&mut document, registered),
            None => add_builtin_font(&mut document, font_alias),
        };

        let mut page_ids: Vec<ObjectId> = Vec::with_capacity(pages.len());
        let pages_id = document.new_object_id();

        for page in &pages {
            let content = self.page_content(page, active.is_some());
            let content_stream = Stream::new(Dictionary::new(), content.encode()?);
            let content_id = document.add_object(content_stream);

            let mut resources = Dictionary::new();
            let mut font_dict = Dictionary::new();
            font_dict.set(FONT_RESOURCE, Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(font_dict));

            let mut page_dict = Dictionary::new();
            page_dict.set("Type", Object::Name(b"Page".to_vec()));
            page_dict.set("Parent", Object::Reference(pages_id));
            page_dict.set("Resources", Object::Dictionary(resources));
            page_dict.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.options.page_width),
                    Object::Real(self.options.page_height),
                ]),
            );
            page_dict.set("Contents", Object::Reference(content_id));

            page_ids.push(document.add_object(Object::Dictionary(page_dict)));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set(
            "Kids",
            Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
        );
        pages_dict.set("Count", Object::Integer(page_ids.len() as i64));
        document
            .objects
            .insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = document.add_object(Object::Dictionary(catalog));

        let mut info_dict = Dictionary::new();
        info_dict.set("Producer", Object::string_literal("docglot"));
        let info_id = document.add_object(Object::Dictionary(info_dict));

        document.trailer.set(b"Root", Object::Reference(catalog_id));
        document.trailer.set(b"Info", Object::Reference(info_id));
        document.compress();

        let mut bytes = Vec::new();
        document.save_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Content stream for one page: the active font is re-selected at the
    /// top, then each placed line is positioned and shown.
    fn page_content(&self, page: &PageLayout, unicode_font: bool) -> Content {
        let mut operations = Vec::with_capacity(page.lines.len() * 2 + 3);
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(self.options.font_size),
            ],
        ));

        for line in &page.lines {
            if line.text.is_empty() {
                continue;
            }
            operations.push(Operation::new(
                "Tm",
                vec![
                    Object::Real(1.0),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(1.0),
                    Object::Real(line.x),
                    Object::Real(line.y),
                ],
            ));
            operations.push(Operation::new("Tj", vec![encode_text(&line.text, unicode_font)]));
        }

        operations.push(Operation::new("ET", vec![]));
        Content { operations }
    }
}

/// Encode a line for the active font's expected string format
fn encode_text(text: &str, unicode_font: bool) -> Object {
    if unicode_font {
        // Identity-H composite font: UTF-16BE code units as hex strings.
        let mut utf16be = Vec::with_capacity(text.len() * 2);
        for unit in text.encode_utf16() {
            utf16be.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(utf16be, StringFormat::Hexadecimal)
    } else {
        // Built-in Type1 font: Latin-1 subset, everything else degrades.
        let bytes = text
            .chars()
            .map(|ch| if (ch as u32) < 256 { ch as u8 } else { b'?' })
            .collect();
        Object::String(bytes, StringFormat::Literal)
    }
}

/// Built-in Type1 font for the fallback path
fn add_builtin_font(document: &mut Document, base_font: &str) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", Object::Name(b"Font".to_vec()));
    font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    font_dict.set(
        "BaseFont",
        Object::Name(sanitize_pdf_font_name(base_font).into_bytes()),
    );
    font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    document.add_object(Object::Dictionary(font_dict))
}

/// Composite Type0 font with a CIDFont descendant for a registered font.
///
/// The font program is embedded for TTF sources; TTC/OTF containers are not
/// valid FontFile2 payloads, so those fall back to viewer-side resolution
/// with an identity CID mapping.
fn add_unicode_font(document: &mut Document, registered: &RegisteredFont) -> ObjectId {
    let base_font_name = sanitize_pdf_font_name(&registered.alias);

    let mut font_descriptor = Dictionary::new();
    font_descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    font_descriptor.set("FontName", Object::Name(base_font_name.clone().into_bytes()));
    font_descriptor.set("Flags", Object::Integer(4));
    font_descriptor.set(
        "FontBBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(-300),
            Object::Integer(1000),
            Object::Integer(1000),
        ]),
    );
    font_descriptor.set("ItalicAngle", Object::Integer(0));
    font_descriptor.set("Ascent", Object::Integer(880));
    font_descriptor.set("Descent", Object::Integer(-120));
    font_descriptor.set("CapHeight", Object::Integer(700));
    font_descriptor.set("StemV", Object::Integer(80));

    let embeddable = registered.file_name.to_ascii_lowercase().ends_with(".ttf")
        && !registered.data.is_empty();
    if embeddable {
        let mut stream_dict = Dictionary::new();
        stream_dict.set("Length1", Object::Integer(registered.data.len() as i64));
        let font_stream = Stream::new(stream_dict, registered.data.as_ref().clone());
        let font_stream_id = document.add_object(Object::Stream(font_stream));
        font_descriptor.set("FontFile2", Object::Reference(font_stream_id));
    }
    let font_descriptor_id = document.add_object(Object::Dictionary(font_descriptor));

    let mut cidfont = Dictionary::new();
    cidfont.set("Type", Object::Name(b"Font".to_vec()));
    cidfont.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
    cidfont.set("BaseFont", Object::Name(base_font_name.clone().into_bytes()));
    cidfont.set(
        "CIDSystemInfo",
        Object::Dictionary({
            let mut d = Dictionary::new();
            d.set("Registry", Object::string_literal("Adobe"));
            d.set("Ordering", Object::string_literal("Identity"));
            d.set("Supplement", Object::Integer(0));
            d
        }),
    );
    cidfont.set("FontDescriptor", Object::Reference(font_descriptor_id));
    cidfont.set("DW", Object::Integer(1000));
    if embeddable {
        // Embedded font: explicit map keeps glyph mapping deterministic.
        let map_id = document.add_object(cid_to_gid_map_stream(registered));
        cidfont.set("CIDToGIDMap", Object::Reference(map_id));
    } else {
        cidfont.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
    }
    let cidfont_id = document.add_object(Object::Dictionary(cidfont));

    let tounicode_id = document.add_object(identity_tounicode_cmap_stream());

    let mut type0 = Dictionary::new();
    type0.set("Type", Object::Name(b"Font".to_vec()));
    type0.set("Subtype", Object::Name(b"Type0".to_vec()));
    type0.set("BaseFont", Object::Name(base_font_name.into_bytes()));
    type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
    type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cidfont_id)]));
    type0.set("ToUnicode", Object::Reference(tounicode_id));

    document.add_object(Object::Dictionary(type0))
}

/// Full BMP CID -> glyph index map (2 bytes per CID); CID codes equal the
/// UTF-16 BMP code units used in the content stream.
fn cid_to_gid_map_stream(registered: &RegisteredFont) -> Object {
    let mut map = vec![0u8; 65536 * 2];
    for cid in 0u32..=0xFFFF {
        if let Some(ch) = char::from_u32(cid) {
            let gid = registered.font.lookup_glyph_index(ch);
            let offset = (cid as usize) * 2;
            map[offset] = (gid >> 8) as u8;
            map[offset + 1] = (gid & 0xFF) as u8;
        }
    }
    Object::Stream(Stream::new(Dictionary::new(), map))
}

fn identity_tounicode_cmap_stream() -> Object {
    let cmap = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0000> <FFFF> <0000>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end"
    .to_vec();
    Object::Stream(Stream::new(Dictionary::new(), cmap))
}

fn sanitize_pdf_font_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('-');
        }
    }
    if out.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer_with(registry: &FontRegistry) -> FixedLayoutRenderer<'_> {
        FixedLayoutRenderer::new(registry, PipelineOptions::default())
    }

    #[test]
    fn wrapped_lines_fit_the_printable_width() {
        let registry = FontRegistry::new();
        let renderer = renderer_with(&registry);
        let options = PipelineOptions::default();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(40);

        for page in renderer.layout(&text, "Helvetica") {
            for line in &page.lines {
                let width = registry.text_width("Helvetica", &line.text, options.font_size);
                assert!(
                    width <= options.printable_width(),
                    "line '{}' measures {width}",
                    line.text
                );
            }
        }
    }

    #[test]
    fn single_overlong_word_is_emitted_as_is() {
        let registry = FontRegistry::new();
        let renderer = renderer_with(&registry);
        let word = "w".repeat(200);
        let pages = renderer.layout(&word, "Helvetica");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 1);
        assert_eq!(pages[0].lines[0].text, word);
    }

    #[test]
    fn pagination_resets_cursor_below_the_top_margin() {
        let registry = FontRegistry::new();
        let renderer = renderer_with(&registry);
        let options = PipelineOptions::default();
        let text = "word ".repeat(3000);

        let pages = renderer.layout(&text, "Helvetica");
        assert!(pages.len() >= 2, "expected multiple pages, got {}", pages.len());
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.number, i + 1);
            for line in &page.lines {
                assert!(line.y >= options.margin, "line below bottom margin at y={}", line.y);
            }
        }
        let top = options.page_height - options.margin;
        assert_eq!(pages[1].lines[0].y, top);
    }

    #[test]
    fn lines_per_page_match_the_cursor_arithmetic() {
        let registry = FontRegistry::new();
        let renderer = renderer_with(&registry);
        let options = PipelineOptions::default();
        let text = "word ".repeat(3000);

        let pages = renderer.layout(&text, "Helvetica");
        // y runs from height - margin down to margin in line_height steps.
        let expected =
            ((options.page_height - 2.0 * options.margin) / options.line_height) as usize + 1;
        assert_eq!(pages[0].lines.len(), expected);
    }

    #[test]
    fn empty_paragraphs_keep_their_vertical_slot() {
        let registry = FontRegistry::new();
        let renderer = renderer_with(&registry);
        let pages = renderer.layout("above\n\nbelow", "Helvetica");
        assert_eq!(pages[0].lines.len(), 3);
        assert_eq!(pages[0].lines[1].text, "");
        assert!(pages[0].lines[1].y > pages[0].lines[2].y);
    }

    #[test]
    fn render_produces_pdf_bytes_with_fallback_font() {
        let registry = FontRegistry::new();
        let renderer = renderer_with(&registry);
        let bytes = renderer
            .render("Hello world\n\nSecond paragraph", "Helvetica")
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > 200);
    }

    #[test]
    fn font_names_are_sanitized_for_pdf_use() {
        assert_eq!(sanitize_pdf_font_name("Noto Sans"), "Noto-Sans");
        assert_eq!(sanitize_pdf_font_name("漢字"), "EmbeddedFont");
        assert_eq!(sanitize_pdf_font_name("Helvetica"), "Helvetica");
    }
}
