//! docglot: document translation pipeline
//!
//! Takes the plain text of a source document as an ordered sequence of
//! lines, pushes it through a size-limited remote translation capability in
//! bounded chunks, and re-renders the translated text as either a flowing
//! (DOCX) document or a fixed-layout (PDF) document with word-wrap,
//! pagination, and font fallback for non-Latin scripts.
//!
//! The surrounding web layer (uploads, routing, file serving) stays
//! outside this crate; its input boundary is text lines plus a target
//! language, and its output is document bytes.

pub mod chunker;
pub mod config;
pub mod docx_writer;
pub mod error;
pub mod fonts;
pub mod pdf_writer;
pub mod translate;

// Re-export commonly used types
pub use chunker::{chunk, Chunk, TextLine};
pub use config::{PipelineOptions, RetryPolicy};
pub use docx_writer::FlowingDocumentWriter;
pub use error::{PipelineError, Result, TranslationFailure};
pub use fonts::FontRegistry;
pub use pdf_writer::FixedLayoutRenderer;
pub use translate::{TranslatedChunk, TranslationOrchestrator, TranslationPolicy, Translator};

use log::info;
use std::sync::Arc;

/// Output document shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Reflowable DOCX output
    Flowing,
    /// Paginated PDF output
    FixedLayout,
}

/// End-to-end pipeline: lines in, translated document bytes out.
///
/// All state is request-scoped except the font registry, whose
/// registration cache is intentionally process-wide.
pub struct DocumentTranslator {
    translator: Arc<dyn Translator>,
    registry: &'static FontRegistry,
    options: PipelineOptions,
}

impl DocumentTranslator {
    /// Build a pipeline over the shared process-wide font registry
    pub fn new(translator: Arc<dyn Translator>, options: PipelineOptions) -> Self {
        Self::with_registry(translator, FontRegistry::global(), options)
    }

    /// Build a pipeline over an explicit font registry
    pub fn with_registry(
        translator: Arc<dyn Translator>,
        registry: &'static FontRegistry,
        options: PipelineOptions,
    ) -> Self {
        Self {
            translator,
            registry,
            options,
        }
    }

    /// Translate extracted lines and render them in the requested format.
    ///
    /// Fails with [`PipelineError::EmptyExtraction`] when no line carries
    /// text, and with [`PipelineError::Translation`] when any chunk's
    /// remote call fails; font problems never fail the request.
    pub async fn translate_document(
        &self,
        lines: &[TextLine],
        target_language: &str,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        if lines.iter().all(|line| line.text.trim().is_empty()) {
            return Err(PipelineError::EmptyExtraction);
        }

        let chunks = chunker::chunk(lines, self.options.max_chars);
        info!(
            "translating {} lines ({} chunks) to '{}'",
            lines.len(),
            chunks.len(),
            target_language
        );

        let orchestrator = TranslationOrchestrator::new(
            self.translator.clone(),
            TranslationPolicy {
                concurrency: self.options.concurrency,
                timeout: self.options.timeout(),
                retry: self.options.retry.clone(),
            },
        );
        let translated = orchestrator.translate_joined(&chunks, target_language).await?;

        match format {
            OutputFormat::Flowing => {
                FlowingDocumentWriter::new(self.options.font_size).write(&translated)
            }
            OutputFormat::FixedLayout => {
                let alias = self.select_font(&translated);
                FixedLayoutRenderer::new(self.registry, self.options.clone())
                    .render(&translated, alias)
            }
        }
    }

    /// Convenience wrapper over [`Self::translate_document`] for raw text
    pub async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let lines = TextLine::sequence(text);
        self.translate_document(&lines, target_language, format).await
    }

    /// Pick the render font: the preferred Unicode font when the text needs
    /// glyphs the built-in font lacks and its asset registered, otherwise
    /// the built-in fallback.
    fn select_font(&self, translated: &str) -> &str {
        if !fonts::needs_unicode_font(translated) {
            return &self.options.fallback_font_alias;
        }
        if let Some(path) = &self.options.preferred_font_path {
            // Lazy and idempotent: only the first attempt does any work.
            self.registry.register(path, &self.options.preferred_font_alias);
        }
        self.registry.resolve(
            &self.options.preferred_font_alias,
            &self.options.fallback_font_alias,
        )
    }
}
