//! Recursive text chunking
//!
//! Splits extracted page texts into overlapping passages. The chunker tries the
//! largest natural boundary first (paragraph, line, sentence, word) and only
//! falls back to finer boundaries for pieces that are still too long. Small
//! pieces are merged back up to `chunk_size` characters, with trailing pieces
//! of each chunk repeated at the start of the next one.

mod splitter;

pub use splitter::Separator;

use crate::config::ChunkingConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use splitter::{char_len, merge_pieces, split_by_chars};
use thiserror::Error;

/// Default boundaries, coarsest first
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("chunk_size must be greater than 0")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },

    #[error("Invalid separator pattern '{pattern}': {message}")]
    InvalidSeparator { pattern: String, message: String },
}

/// A contiguous passage of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the document's chunk sequence
    pub index: usize,
    /// Index of the page (or text segment) the chunk was cut from
    pub page: usize,
    /// Character offset of the chunk within its page
    pub source_offset: usize,
    pub text: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

/// Recursive character chunker
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Separator>,
}

impl Chunker {
    /// Create a chunker with the default separator hierarchy
    ///
    /// # Arguments
    /// * `chunk_size` - Maximum characters per chunk
    /// * `chunk_overlap` - Characters shared between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                size: chunk_size,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS
                .iter()
                .map(|s| Separator::Literal(s.to_string()))
                .collect(),
        })
    }

    /// Replace the separator hierarchy
    ///
    /// With `as_regex` every separator is compiled as a regular expression,
    /// except the empty string which always means character-level splitting.
    pub fn with_separators(
        mut self,
        separators: &[String],
        as_regex: bool,
    ) -> Result<Self, ChunkingError> {
        let mut compiled = Vec::with_capacity(separators.len());
        for sep in separators {
            if as_regex && !sep.is_empty() {
                let re = Regex::new(sep).map_err(|e| ChunkingError::InvalidSeparator {
                    pattern: sep.clone(),
                    message: e.to_string(),
                })?;
                compiled.push(Separator::Pattern(re));
            } else {
                compiled.push(Separator::Literal(sep.clone()));
            }
        }
        self.separators = compiled;
        Ok(self)
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ChunkingError> {
        Self::new(config.chunk_size, config.chunk_overlap)?
            .with_separators(&config.separators, config.separators_are_regex)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk a sequence of page texts
    ///
    /// Chunk indices run across pages in source order. Empty pages produce no
    /// chunks.
    pub fn chunk(&self, pages: &[String]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (page, text) in pages.iter().enumerate() {
            let mut cursor = 0usize;

            for piece in self.split_text(text) {
                let trimmed = piece.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let byte_start = text
                    .get(cursor..)
                    .and_then(|rest| rest.find(trimmed))
                    .map(|pos| cursor + pos)
                    .unwrap_or(cursor.min(text.len()));
                let source_offset = char_len(&text[..byte_start]);
                cursor = byte_start
                    + text[byte_start..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(0);

                chunks.push(Chunk {
                    index: chunks.len(),
                    page,
                    source_offset,
                    text: trimmed.to_string(),
                });
            }
        }

        tracing::debug!(
            "Chunked {} page(s) into {} chunk(s) (size={}, overlap={})",
            pages.len(),
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );

        chunks
    }

    /// Split a single text into chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        let mut result = Vec::new();

        // Coarsest separator present in the text wins
        let mut active = None;
        let mut finer: &[Separator] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_char_level() {
                active = Some(sep);
                break;
            }
            if sep.occurs_in(text) {
                active = Some(sep);
                finer = &separators[i + 1..];
                break;
            }
        }

        let Some(separator) = active else {
            return split_by_chars(text, self.chunk_size, self.chunk_overlap);
        };

        let mut small: Vec<&str> = Vec::new();
        for piece in separator.split(text) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                result.extend(merge_pieces(&small, self.chunk_size, self.chunk_overlap));
                small.clear();
            }

            if finer.is_empty() {
                result.extend(split_by_chars(piece, self.chunk_size, self.chunk_overlap));
            } else {
                result.extend(self.split_recursive(piece, finer));
            }
        }

        if !small.is_empty() {
            result.extend(merge_pieces(&small, self.chunk_size, self.chunk_overlap));
        }

        result
    }
}
