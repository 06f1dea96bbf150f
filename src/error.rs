//! Pipeline error types
//!
//! Unified error handling for the translation pipeline. Extraction and
//! translation failures are meant to be reported at the request boundary;
//! font failures never escape the renderer and only appear here so the
//! registry can record why a registration was rejected.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Request-scoped pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source document yielded no translatable text
    #[error("no extractable text found in the source document")]
    EmptyExtraction,

    /// A chunk's remote translation call failed; the whole request aborts
    #[error("translation failed for chunk {chunk_index}: {source}")]
    Translation {
        chunk_index: usize,
        #[source]
        source: TranslationFailure,
    },

    /// A font could not be registered (recovered internally via fallback)
    #[error("font registration failed for '{alias}': {reason}")]
    FontRegistration { alias: String, reason: String },

    /// PDF serialization failed
    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),

    /// DOCX packaging failed
    #[error("DOCX packaging failed: {0}")]
    Docx(#[from] zip::result::ZipError),

    /// XML serialization failed
    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error while producing output bytes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single remote translation call failed
#[derive(Debug, Error)]
pub enum TranslationFailure {
    /// The translation service reported an error
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The imposed deadline expired before the service answered
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
}
