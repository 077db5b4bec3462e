//! Fixed-width character chunking with sentence-boundary snapping.

use super::TextChunker;

/// How far back from a window edge to search for a snap point, in chars.
const BOUNDARY_SCAN: usize = 100;

/// Greedy fixed-width windowing over characters.
///
/// At each window edge the cut snaps backward, within the last
/// [`BOUNDARY_SCAN`] characters, to just after sentence punctuation
/// (`. ! ?`), or failing that to the last whitespace. The next window
/// starts `chunk_overlap` characters before the cut, so consecutive chunks
/// overlap and concatenating them with the overlap trimmed reconstructs
/// the source text.
///
/// Overlap is clamped below `chunk_size` at construction and the window
/// start always moves by at least one character, so chunking cannot stall
/// on any input.
#[derive(Debug, Clone)]
pub struct CharacterChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl CharacterChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunk_overlap = chunk_overlap.min(chunk_size - 1);
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Find the cut position for a window `[start, hard_end)`.
    ///
    /// Prefers a position just after sentence punctuation, then the last
    /// whitespace; falls back to the hard edge when neither is in range.
    fn snap(chars: &[char], start: usize, hard_end: usize) -> usize {
        let scan_floor = hard_end.saturating_sub(BOUNDARY_SCAN).max(start + 1);

        for i in (scan_floor..hard_end).rev() {
            if matches!(chars[i], '.' | '!' | '?') {
                return i + 1;
            }
        }
        for i in (scan_floor..hard_end).rev() {
            if chars[i].is_whitespace() {
                return i;
            }
        }
        hard_end
    }
}

impl TextChunker for CharacterChunker {
    fn chunk_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());
            let end = if hard_end < chars.len() {
                Self::snap(&chars, start, hard_end)
            } else {
                hard_end
            };

            let piece: String = chars[start..end].iter().collect();
            if !piece.trim().is_empty() {
                chunks.push(piece);
            }

            if end >= chars.len() {
                break;
            }
            // Always at least one char of progress, whatever the snap did.
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }
}
