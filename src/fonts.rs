//! Font registry for fixed-layout rendering
//!
//! Keeps a process-wide cache of renderable fonts, registered lazily from
//! font files on first use. Load failures never propagate: `register`
//! reports a boolean and `resolve` degrades to the built-in fallback font,
//! so rendering always proceeds (at the cost of glyph coverage for
//! non-Latin scripts when the preferred font asset is missing).

use fontdue::{Font, FontSettings};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};
use unicode_script::{Script, UnicodeScript};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::PipelineError;

/// Outcome of a registration attempt, cached per alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Registered,
    Failed,
}

/// A font known to the registry
#[derive(Clone)]
pub struct FontEntry {
    pub alias: String,
    pub state: RegistrationState,
    /// Parsed font, present only for successful registrations
    font: Option<Arc<Font>>,
    /// Raw font bytes, kept for PDF embedding
    data: Arc<Vec<u8>>,
    /// Source file name, used to decide the embedding strategy
    file_name: String,
}

/// A successfully registered font, handed to the renderer
#[derive(Clone)]
pub struct RegisteredFont {
    pub alias: String,
    pub font: Arc<Font>,
    pub data: Arc<Vec<u8>>,
    pub file_name: String,
}

/// Process-wide font registration cache.
///
/// Registration is at-most-once per alias: the first attempt's outcome
/// sticks, and repeat attempts are no-ops reporting that outcome. Reads are
/// concurrent; first registrations for the same alias serialize on the
/// write lock.
#[derive(Default)]
pub struct FontRegistry {
    entries: RwLock<HashMap<String, FontEntry>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide registry
    pub fn global() -> &'static FontRegistry {
        static GLOBAL: OnceLock<FontRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FontRegistry::new)
    }

    /// Try to load a font file under `alias`; returns whether the alias is
    /// usable. Missing files and parse failures are swallowed into `false`.
    pub fn register(&self, font_path: &Path, alias: &str) -> bool {
        let mut entries = self.entries.write().expect("font registry poisoned");
        if let Some(existing) = entries.get(alias) {
            return existing.state == RegistrationState::Registered;
        }

        let outcome = Self::load_font(font_path, alias);
        let entry = match outcome {
            Ok(entry) => entry,
            Err(err) => {
                warn!("font registration failed, falling back: {err}");
                FontEntry {
                    alias: alias.to_string(),
                    state: RegistrationState::Failed,
                    font: None,
                    data: Arc::new(Vec::new()),
                    file_name: String::new(),
                }
            }
        };

        let registered = entry.state == RegistrationState::Registered;
        if registered {
            debug!("registered font '{}' from {}", alias, font_path.display());
        }
        entries.insert(alias.to_string(), entry);
        registered
    }

    fn load_font(font_path: &Path, alias: &str) -> Result<FontEntry, PipelineError> {
        if !font_path.exists() {
            return Err(PipelineError::FontRegistration {
                alias: alias.to_string(),
                reason: format!("font file not found: {}", font_path.display()),
            });
        }
        let data = std::fs::read(font_path).map_err(|e| PipelineError::FontRegistration {
            alias: alias.to_string(),
            reason: format!("could not read {}: {e}", font_path.display()),
        })?;
        let font = Font::from_bytes(data.clone(), FontSettings::default()).map_err(|e| {
            PipelineError::FontRegistration {
                alias: alias.to_string(),
                reason: format!("could not parse {}: {e}", font_path.display()),
            }
        })?;

        let file_name = font_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FontEntry {
            alias: alias.to_string(),
            state: RegistrationState::Registered,
            font: Some(Arc::new(font)),
            data: Arc::new(data),
            file_name,
        })
    }

    /// Return `alias` if it was successfully registered, else `fallback_alias`
    pub fn resolve<'a>(&self, alias: &'a str, fallback_alias: &'a str) -> &'a str {
        let entries = self.entries.read().expect("font registry poisoned");
        match entries.get(alias) {
            Some(entry) if entry.state == RegistrationState::Registered => alias,
            _ => fallback_alias,
        }
    }

    /// Fetch the parsed font behind a registered alias
    pub fn registered(&self, alias: &str) -> Option<RegisteredFont> {
        let entries = self.entries.read().expect("font registry poisoned");
        let entry = entries.get(alias)?;
        let font = entry.font.clone()?;
        Some(RegisteredFont {
            alias: entry.alias.clone(),
            font,
            data: entry.data.clone(),
            file_name: entry.file_name.clone(),
        })
    }

    /// Measured width of `text` at `size` layout units.
    ///
    /// Registered fonts use real advance metrics; the built-in fallback font
    /// has no parseable file, so its width is estimated per character class.
    pub fn text_width(&self, alias: &str, text: &str, size: f32) -> f32 {
        match self.registered(alias) {
            Some(reg) => text
                .chars()
                .map(|ch| reg.font.metrics(ch, size).advance_width)
                .sum(),
            None => estimate_builtin_width(text, size),
        }
    }
}

/// Coarse width estimate for the built-in fallback font.
///
/// Counts grapheme clusters so combining sequences are not double-billed.
pub fn estimate_builtin_width(text: &str, size: f32) -> f32 {
    text.graphemes(true)
        .map(|g| {
            let ch = g.chars().next().unwrap_or(' ');
            builtin_char_width(ch, size)
        })
        .sum()
}

fn builtin_char_width(ch: char, size: f32) -> f32 {
    match ch {
        ' ' | 'i' | 'l' | 'j' | 't' | 'f' | '.' | ',' | '\'' | '!' | ':' | ';' | '|' => size * 0.28,
        'm' | 'w' | 'M' | 'W' | '@' => size * 0.85,
        c if c.is_ascii_uppercase() || c.is_ascii_digit() => size * 0.67,
        c if c.is_ascii() => size * 0.5,
        // Non-Latin glyphs render as a fixed-width fallback box at worst.
        _ => size * 0.9,
    }
}

/// Whether `text` contains scripts the built-in fallback font cannot cover
pub fn needs_unicode_font(text: &str) -> bool {
    text.chars().any(|ch| {
        !matches!(
            ch.script(),
            Script::Latin | Script::Common | Script::Inherited
        )
    })
}
