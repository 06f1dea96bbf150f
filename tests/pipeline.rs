//! End-to-end pipeline scenarios: extraction input through translation to
//! rendered document bytes, with a scripted translator standing in for the
//! remote service.

use async_trait::async_trait;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docglot::{
    chunk, DocumentTranslator, FontRegistry, OutputFormat, PipelineOptions, TextLine,
    TranslationFailure, Translator,
};

/// Tags every chunk with the target language and counts remote calls
struct ScriptedTranslator {
    calls: AtomicUsize,
}

impl ScriptedTranslator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate_one(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Line structure survives translation; words change per line.
        let translated = text
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{target_language}:{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(translated)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn document_xml(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx.to_vec())).unwrap();
    let mut entry = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    entry.read_to_string(&mut xml).unwrap();
    xml
}

#[tokio::test]
async fn scenario_flowing_output_keeps_empty_blocks() {
    // Three lines under max_chars form a single chunk; the flowing writer
    // emits three blocks with the middle one empty.
    let lines = vec![
        TextLine {
            index: 0,
            text: "Hello world".to_string(),
        },
        TextLine {
            index: 1,
            text: String::new(),
        },
        TextLine {
            index: 2,
            text: "Second paragraph".to_string(),
        },
    ];
    assert_eq!(chunk(&lines, 4000).len(), 1);

    let translator = Arc::new(ScriptedTranslator::new());
    let pipeline = DocumentTranslator::new(translator.clone(), PipelineOptions::default());
    let bytes = pipeline
        .translate_document(&lines, "hi", OutputFormat::Flowing)
        .await
        .unwrap();

    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    let xml = document_xml(&bytes);
    assert_eq!(xml.matches("<w:p").count(), 3);
    assert!(xml.contains("<w:p/>"));
    assert!(xml.contains("hi:Hello world"));
    assert!(xml.contains("hi:Second paragraph"));
    let first = xml.find("hi:Hello world").unwrap();
    let last = xml.find("hi:Second paragraph").unwrap();
    assert!(first < last);
}

#[tokio::test]
async fn scenario_three_chunks_translate_in_order() {
    // 90 lines of 100 bytes chunk into three pieces under the 4000 limit;
    // one remote call per chunk, output order matching input order.
    let text = (0..90)
        .map(|i| format!("{:0>96}-{:03}", "line", i))
        .collect::<Vec<_>>()
        .join("\n");
    let lines = TextLine::sequence(&text);
    assert_eq!(chunk(&lines, 4000).len(), 3);

    let translator = Arc::new(ScriptedTranslator::new());
    let pipeline = DocumentTranslator::new(translator.clone(), PipelineOptions::default());
    let bytes = pipeline
        .translate_document(&lines, "fr", OutputFormat::Flowing)
        .await
        .unwrap();

    assert_eq!(translator.calls.load(Ordering::SeqCst), 3);
    let xml = document_xml(&bytes);
    let mut previous = 0;
    for i in [0usize, 20, 45, 70, 89] {
        let marker = format!("-{i:03}");
        let at = xml.find(&marker).unwrap_or_else(|| panic!("missing line {i}"));
        assert!(at >= previous, "line {i} out of order");
        previous = at;
    }
}

#[tokio::test]
async fn scenario_missing_preferred_font_falls_back() -> anyhow::Result<()> {
    // The preferred Unicode font asset is absent: registration reports
    // failure, resolution degrades to the built-in font, and fixed-layout
    // rendering still succeeds for non-Latin text.
    let registry = FontRegistry::new();
    let missing = Path::new("/no/such/NotoSans-Regular.ttf");
    assert!(!registry.register(missing, "unicode"));
    assert_eq!(registry.resolve("unicode", "Helvetica"), "Helvetica");

    let options = PipelineOptions {
        preferred_font_path: Some(PathBuf::from(missing)),
        ..PipelineOptions::default()
    };
    let pipeline = DocumentTranslator::new(Arc::new(ScriptedTranslator::new()), options);
    let bytes = pipeline
        .translate_text("नमस्ते दुनिया\n\nदूसरा अनुच्छेद", "hi", OutputFormat::FixedLayout)
        .await?;
    assert!(bytes.starts_with(b"%PDF-"));
    Ok(())
}

#[tokio::test]
async fn fixed_layout_output_is_a_pdf_for_long_documents() -> anyhow::Result<()> {
    let text = (0..200)
        .map(|i| format!("Paragraph {i} with enough words to wrap at least once on a page."))
        .collect::<Vec<_>>()
        .join("\n");
    let pipeline =
        DocumentTranslator::new(Arc::new(ScriptedTranslator::new()), PipelineOptions::default());
    let bytes = pipeline
        .translate_text(&text, "de", OutputFormat::FixedLayout)
        .await?;
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.ends_with(b"%%EOF") || bytes.ends_with(b"%%EOF\n"));
    Ok(())
}
