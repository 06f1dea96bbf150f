//! Text chunking for size-limited translation calls
//!
//! Splits an ordered sequence of text lines into bounded segments without
//! ever splitting a line. Packing is greedy and single-pass: lines fill the
//! current chunk until the next one would push it past `max_chars`, then a
//! new chunk starts. Greedy (non-optimal) packing is the intended behavior;
//! chunk boundaries are part of the observable contract.

use log::{debug, warn};

/// An index-tagged line of source text.
///
/// Lines keep their original relative order through the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub index: usize,
    pub text: String,
}

impl TextLine {
    /// Number the `\n`-delimited lines of a text in order
    pub fn sequence(text: &str) -> Vec<TextLine> {
        text.split('\n')
            .enumerate()
            .map(|(index, line)| TextLine {
                index,
                text: line.to_string(),
            })
            .collect()
    }
}

/// A contiguous run of lines sized for one remote translation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk among its siblings; reassembly key
    pub index: usize,
    pub lines: Vec<TextLine>,
}

impl Chunk {
    /// The chunk's text as sent to the translation service
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.byte_len());
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.text);
        }
        out
    }

    /// Byte length of the chunk's joined text, separators included
    pub fn byte_len(&self) -> usize {
        let text_len: usize = self.lines.iter().map(|l| l.text.len()).sum();
        text_len + self.lines.len().saturating_sub(1)
    }
}

/// Pack lines into chunks whose joined byte length stays within `max_chars`.
///
/// A single line longer than `max_chars` forms its own oversized chunk; the
/// remote service may reject it, but lines are never split here. Joining the
/// chunk texts with `\n`, in order, reconstructs the input exactly.
pub fn chunk(lines: &[TextLine], max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut buffer: Vec<TextLine> = Vec::new();
    let mut buffer_len = 0usize;

    for line in lines {
        // Account for the separator a non-empty buffer would gain.
        let added = if buffer.is_empty() {
            line.text.len()
        } else {
            line.text.len() + 1
        };

        if !buffer.is_empty() && buffer_len + added > max_chars {
            chunks.push(Chunk {
                index: chunks.len(),
                lines: std::mem::take(&mut buffer),
            });
            buffer_len = 0;
        }

        if buffer.is_empty() && line.text.len() > max_chars {
            warn!(
                "line {} is {} bytes, over the {} byte chunk limit; sending unsplit",
                line.index,
                line.text.len(),
                max_chars
            );
        }

        buffer_len += if buffer.is_empty() {
            line.text.len()
        } else {
            line.text.len() + 1
        };
        buffer.push(line.clone());
    }

    if !buffer.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            lines: buffer,
        });
    }

    debug!(
        "chunked {} lines into {} chunks (max {} bytes)",
        lines.len(),
        chunks.len(),
        max_chars
    );
    chunks
}

/// Join chunk texts back into one document, mirroring the chunk separator
pub fn join_chunks(texts: &[String]) -> String {
    texts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(text: &str) -> Vec<TextLine> {
        TextLine::sequence(text)
    }

    #[test]
    fn concatenation_reconstructs_input_exactly() {
        let text = "first line\nsecond line\n\nfourth after an empty one\nlast";
        let chunks = chunk(&lines_of(text), 20);
        let joined: Vec<String> = chunks.iter().map(|c| c.text()).collect();
        assert_eq!(join_chunks(&joined), text);
    }

    #[test]
    fn chunks_respect_the_byte_bound() {
        let text = (0..50)
            .map(|i| format!("line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        for c in chunk(&lines_of(text.as_str()), 100) {
            assert!(c.byte_len() <= 100, "chunk {} is {} bytes", c.index, c.byte_len());
        }
    }

    #[test]
    fn oversized_line_becomes_its_own_chunk_unsplit() {
        let long = "x".repeat(500);
        let text = format!("short\n{long}\ntail");
        let chunks = chunk(&lines_of(&text), 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].lines.len(), 1);
        assert_eq!(chunks[1].text(), long);
        assert!(chunks[1].byte_len() > 100);
    }

    #[test]
    fn chunking_is_deterministic_and_order_preserving() {
        let text = (0..30)
            .map(|i| format!("paragraph {i} with a bit of content"))
            .collect::<Vec<_>>()
            .join("\n");
        let lines = lines_of(&text);
        let first = chunk(&lines, 120);
        let second = chunk(&lines, 120);
        assert_eq!(first, second);

        let mut seen = 0;
        for c in &first {
            for line in &c.lines {
                assert_eq!(line.index, seen);
                seen += 1;
            }
        }
        assert_eq!(seen, lines.len());
    }

    #[test]
    fn nine_thousand_chars_pack_into_three_chunks() {
        // 90 lines of 100 bytes; with separators each chunk tops out at
        // 39 lines (39 * 100 + 38 = 3938 bytes) under the 4000 limit.
        let text = (0..90)
            .map(|i| format!("{:0>100}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk(&lines_of(&text), 4000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].lines.len(), 39);
        assert_eq!(chunks[1].lines.len(), 39);
        assert_eq!(chunks[2].lines.len(), 12);
        let joined: Vec<String> = chunks.iter().map(|c| c.text()).collect();
        assert_eq!(join_chunks(&joined), text);
    }

    #[test]
    fn single_chunk_for_small_documents() {
        let chunks = chunk(&lines_of("Hello world\n\nSecond paragraph"), 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lines.len(), 3);
        assert_eq!(chunks[0].lines[1].text, "");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk(&[], 4000).is_empty());
    }
}
