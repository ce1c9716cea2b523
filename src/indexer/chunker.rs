use crate::error::{RagError, Result};
use crate::index::models::{Chunk, SourceDocument};

/// Break points in priority order. Within one level the latest break wins.
const SEPARATOR_LEVELS: &[&[&str]] = &[
    &["\n\n"],
    &["\n", "。"],
    &[". ", "! ", "? "],
    &[" ", "\t"],
];

/// Splits documents into overlapping windows of at most `chunk_size` characters.
///
/// Sizes are measured in `char`s. Consecutive chunks of one document share
/// exactly `chunk_overlap` characters, so dropping the first `chunk_overlap`
/// characters of every chunk after the first and concatenating reproduces the
/// original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker, rejecting `chunk_size == 0` and `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk every document, flattening the result documents-then-chunks.
    pub fn split_documents(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text)
                    .into_iter()
                    .map(move |text| Chunk {
                        text,
                        provenance: doc.provenance.clone(),
                    })
            })
            .collect()
    }

    /// Split a single text. Empty input yields no chunks; input no longer than
    /// `chunk_size` yields exactly one.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let end = self.find_break(&chars, start);
            chunks.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick the exclusive end of the chunk starting at `start`.
    ///
    /// Only called while more than `chunk_size` characters remain.
    fn find_break(&self, chars: &[char], start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        // Must advance past the overlap, and should fill at least half a window.
        let min_end = start + (self.chunk_overlap + 1).max(self.chunk_size / 2);

        for level in SEPARATOR_LEVELS {
            for end in (min_end..=hard_end).rev() {
                if level.iter().any(|sep| ends_with_at(chars, end, sep)) {
                    return end;
                }
            }
        }

        hard_end
    }
}

/// Whether `chars[..end]` ends with `sep`.
fn ends_with_at(chars: &[char], end: usize, sep: &str) -> bool {
    let sep_len = sep.chars().count();
    end >= sep_len && chars[end - sep_len..end].iter().copied().eq(sep.chars())
}
