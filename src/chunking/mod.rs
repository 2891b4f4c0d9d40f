//! Text chunking for breaking documents into indexable pieces.
//!
//! Splits on paragraph, line, sentence, then word boundaries, falling back to
//! a hard character split, and merges pieces into chunks of the configured
//! size with a configured overlap between consecutive chunks.

use serde::{Deserialize, Serialize};

/// Separators tried in order, coarsest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// A chunk of document text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Order of this chunk in the document.
    pub order: i32,
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 150,
        }
    }
}

/// Recursive character text splitter.
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    /// Create a splitter with the given configuration.
    pub fn new(config: ChunkingConfig) -> Self {
        let config = ChunkingConfig {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size / 2),
        };
        Self { config }
    }

    /// Split text into ordered chunks.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let pieces = self.decompose(text, SEPARATORS);
        self.merge(pieces)
            .into_iter()
            .enumerate()
            .map(|(i, content)| TextChunk {
                content,
                order: i as i32,
            })
            .collect()
    }

    /// Break text into pieces no longer than the chunk size, preferring the
    /// coarsest separator that applies.
    fn decompose(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if text.len() <= self.config.chunk_size {
            return vec![text.to_string()];
        }

        match separators.first() {
            Some(sep) if text.contains(sep) => {
                let mut pieces = Vec::new();
                for part in text.split_inclusive(sep) {
                    if part.len() > self.config.chunk_size {
                        pieces.extend(self.decompose(part, &separators[1..]));
                    } else {
                        pieces.push(part.to_string());
                    }
                }
                pieces
            }
            Some(_) => self.decompose(text, &separators[1..]),
            None => hard_split(text, self.config.chunk_size),
        }
    }

    /// Greedily merge pieces into chunks, seeding each new chunk with the
    /// tail of the previous one for overlap.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut has_content = false;

        for piece in pieces {
            if has_content && current.len() + piece.len() > self.config.chunk_size {
                let tail = overlap_tail(&current, self.config.chunk_overlap).to_string();
                let done = std::mem::take(&mut current);
                let done = done.trim();
                if !done.is_empty() {
                    chunks.push(done.to_string());
                }
                current = tail;
                has_content = false;
            }
            current.push_str(&piece);
            has_content = true;
        }

        if has_content {
            let last = current.trim();
            if !last.is_empty() {
                chunks.push(last.to_string());
            }
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// The trailing `overlap` bytes of a string, adjusted to a char boundary.
fn overlap_tail(s: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    if s.len() <= overlap {
        return s;
    }
    let mut idx = s.len() - overlap;
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    &s[idx..]
}

/// Split text at fixed size boundaries, respecting char boundaries.
fn hard_split(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            end = (start + size).min(text.len());
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        pieces.push(text[start..end].to_string());
        start = end;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = TextSplitter::default().split("A short note.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "A short note.");
        assert_eq!(chunks[0].order, 0);
    }

    #[test]
    fn test_empty_text() {
        assert!(TextSplitter::default().split("   \n  ").is_empty());
    }

    #[test]
    fn test_chunk_size_bound() {
        let text = "word ".repeat(500);
        let splitter = splitter(100, 20);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // Overlap seed may push a chunk slightly past the target size
            assert!(chunk.content.len() <= 120, "chunk too long: {}", chunk.content.len());
        }
    }

    #[test]
    fn test_chunks_overlap() {
        let text = "alpha beta gamma delta ".repeat(30);
        let splitter = splitter(100, 30);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev = &pair[0].content;
            let next = &pair[1].content;
            // The next chunk starts with text drawn from the end of the previous one
            let seed: String = next.chars().take(10).collect();
            assert!(prev.contains(seed.trim()), "no overlap between chunks");
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let splitter = splitter(100, 0);
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.chars().all(|c| c == 'a'));
        assert!(chunks[1].content.chars().all(|c| c == 'b'));
    }

    #[test]
    fn test_hard_split_unbroken_text() {
        let text = "x".repeat(450);
        let splitter = splitter(100, 0);
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.content.len() <= 100));
    }

    #[test]
    fn test_orders_are_sequential() {
        let text = "sentence one. ".repeat(50);
        let chunks = splitter(100, 10).split(&text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.order, i as i32);
        }
    }
}
