//! Offset-tracked sliding-window chunker.
//!
//! Offsets are character (not byte) positions into the original section
//! text, so `text.chars().skip(start).take(end - start)` reproduces every
//! snippet exactly.

use crate::models::{SnippetPayload, SnippetSection};

/// Window size and overlap, in characters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkerConfig {
    pub window: usize,
    pub overlap: usize,
}

impl ChunkerConfig {
    pub const ABSTRACT: ChunkerConfig = ChunkerConfig { window: 1200, overlap: 200 };
    pub const CLAIMS: ChunkerConfig = ChunkerConfig { window: 1500, overlap: 250 };
    pub const DESCRIPTION: ChunkerConfig = ChunkerConfig { window: 2000, overlap: 400 };

    /// Per-section defaults; summaries use the abstract window.
    pub fn for_section(section: SnippetSection) -> Self {
        match section {
            SnippetSection::Claims      => Self::CLAIMS,
            SnippetSection::Description => Self::DESCRIPTION,
            _                           => Self::ABSTRACT,
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::ABSTRACT
    }
}

/// Split `text` into overlapping windows.
///
/// Each window ends at `min(start + window, len)`; the next one starts
/// `window - overlap` characters later, but always at least one character
/// later. Empty text yields no snippets.
pub fn chunk_text(text: &str, section: SnippetSection, config: ChunkerConfig) -> Vec<SnippetPayload> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let length = bounds.len() - 1;

    let window = config.window.max(1);
    let step = window.saturating_sub(config.overlap).max(1);

    let mut snippets = Vec::new();
    let mut start = 0;
    while start < length {
        let end = (start + window).min(length);
        snippets.push(SnippetPayload {
            section,
            start_char: start,
            end_char: end,
            text: text[bounds[start]..bounds[end]].to_string(),
        });
        if end == length {
            break;
        }
        start += step;
    }

    snippets
}
