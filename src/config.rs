//! Pipeline configuration
//!
//! Recognized options for chunking, translation, and both output renderers.
//! Defaults approximate a standard page (595x842 layout units) and match
//! the limits the remote translation service tolerates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Options controlling one translation request end to end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Upper bound on a chunk's byte length sent to the translation service
    pub max_chars: usize,

    // Fixed-layout page geometry, in layout units
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub line_height: f32,
    pub font_size: f32,
    /// Extra vertical gap after each paragraph's last line
    pub paragraph_gap: f32,

    /// Preferred Unicode font file; registered lazily on first render
    pub preferred_font_path: Option<PathBuf>,
    /// Alias the preferred font is registered under
    pub preferred_font_alias: String,
    /// Built-in font used when the preferred font is unavailable
    pub fallback_font_alias: String,

    /// Maximum concurrent translation calls per request
    pub concurrency: usize,
    /// Per-chunk deadline in seconds; 0 disables the timeout
    pub timeout_secs: u64,
    /// Retry policy for failed translation calls (no retries by default)
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            page_width: 595.0,
            page_height: 842.0,
            margin: 40.0,
            line_height: 14.0,
            font_size: 12.0,
            paragraph_gap: 4.0,
            preferred_font_path: None,
            preferred_font_alias: "unicode".to_string(),
            fallback_font_alias: "Helvetica".to_string(),
            concurrency: 4,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineOptions {
    /// Parse options from a JSON document, filling omitted fields with defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Per-chunk deadline, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    /// Printable width of a fixed-layout page
    pub fn printable_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }
}

/// Retry behavior for failed translation calls.
///
/// The service ships with retries disabled; operators that want
/// retry-with-backoff opt in per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Base backoff delay in milliseconds, doubled per attempt
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}
