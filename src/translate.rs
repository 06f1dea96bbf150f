//! Translation orchestration
//!
//! Drives chunked text through an injected translation capability and
//! reassembles the results in original order. Chunks are submitted
//! concurrently up to a configured cap; results are keyed by chunk index so
//! the joined output is identical no matter which calls finish first. The
//! orchestrator is fail-fast: the first chunk failure aborts the whole call
//! and in-flight siblings are dropped with it.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::chunker::{join_chunks, Chunk};
use crate::config::RetryPolicy;
use crate::error::{PipelineError, Result, TranslationFailure};

/// A remote translation capability.
///
/// Implementations wrap whatever service performs the actual translation;
/// the orchestrator only assumes each call may fail or hang.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one chunk of text into the target language
    async fn translate_one(
        &self,
        text: &str,
        target_language: &str,
    ) -> std::result::Result<String, TranslationFailure>;

    /// Human-readable service name for diagnostics
    fn name(&self) -> &str {
        "translator"
    }
}

/// The translation-service output for exactly one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedChunk {
    /// The source chunk's position; reassembly key
    pub index: usize,
    pub text: String,
}

/// Limits applied to each remote call
#[derive(Debug, Clone)]
pub struct TranslationPolicy {
    /// Maximum concurrent calls per request
    pub concurrency: usize,
    /// Deadline per call; `None` disables the timeout
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl Default for TranslationPolicy {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Some(Duration::from_secs(30)),
            retry: RetryPolicy::default(),
        }
    }
}

/// Orchestrates chunked translation against one capability
pub struct TranslationOrchestrator {
    translator: Arc<dyn Translator>,
    policy: TranslationPolicy,
}

impl TranslationOrchestrator {
    pub fn new(translator: Arc<dyn Translator>, policy: TranslationPolicy) -> Self {
        Self { translator, policy }
    }

    /// Translate every chunk, returning results in original chunk order.
    ///
    /// Any chunk failure aborts the whole call; partial results are
    /// discarded and the error names the failing chunk and its cause.
    pub async fn translate(
        &self,
        chunks: &[Chunk],
        target_language: &str,
    ) -> Result<Vec<TranslatedChunk>> {
        info!(
            "translating {} chunks to '{}' with {}",
            chunks.len(),
            target_language,
            self.translator.name()
        );

        let mut slots: Vec<Option<String>> = vec![None; chunks.len()];
        let concurrency = self.policy.concurrency.max(1);

        let mut in_flight = stream::iter(chunks.iter().map(|chunk| {
            let text = chunk.text();
            let index = chunk.index;
            async move { (index, self.translate_chunk(index, &text, target_language).await) }
        }))
        .buffer_unordered(concurrency);

        while let Some((index, outcome)) = in_flight.next().await {
            match outcome {
                Ok(text) => {
                    debug!("chunk {index} translated ({} bytes)", text.len());
                    slots[index] = Some(text);
                }
                // Dropping the stream cancels in-flight siblings.
                Err(source) => {
                    return Err(PipelineError::Translation {
                        chunk_index: index,
                        source,
                    })
                }
            }
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, text)| TranslatedChunk {
                index,
                // Every slot was filled or we returned above.
                text: text.unwrap_or_default(),
            })
            .collect())
    }

    /// Translate and join chunk texts with the chunk-join separator
    pub async fn translate_joined(&self, chunks: &[Chunk], target_language: &str) -> Result<String> {
        let translated = self.translate(chunks, target_language).await?;
        let texts: Vec<String> = translated.into_iter().map(|c| c.text).collect();
        Ok(join_chunks(&texts))
    }

    async fn translate_chunk(
        &self,
        index: usize,
        text: &str,
        target_language: &str,
    ) -> std::result::Result<String, TranslationFailure> {
        let mut attempt = 0u32;
        loop {
            let call = self.translator.translate_one(text, target_language);
            let outcome = match self.policy.timeout {
                Some(deadline) => match tokio::time::timeout(deadline, call).await {
                    Ok(result) => result,
                    Err(_) => Err(TranslationFailure::Timeout(deadline)),
                },
                None => call.await,
            };

            match outcome {
                Ok(translated) => return Ok(translated),
                Err(failure) if attempt < self.policy.retry.max_retries => {
                    attempt += 1;
                    let delay = self.policy.retry.backoff_for(attempt);
                    warn!(
                        "chunk {index} failed ({failure}), retry {attempt}/{} after {delay:?}",
                        self.policy.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}
