//! Document chunking.
//!
//! [`RecursiveChunker`] splits text along the coarsest natural boundary that
//! keeps pieces under the size limit: paragraphs, then lines, then sentences,
//! then words. Pieces are merged greedily back up to `chunk_size` and each
//! chunk after the first starts with the last `chunk_overlap` characters of
//! its predecessor, so context carries across every cut point.
//!
//! All sizes are measured in characters, not bytes.

use std::ops::Range;

use crate::config::RagConfig;
use crate::document::{Chunk, Document};

/// Boundaries tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later when the index is built.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// A finer separator is only applied to a piece that still exceeds
/// `chunk_size`; a piece with no separator left is cut by character count.
///
/// # Example
///
/// ```rust,ignore
/// use syllabus_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(400, 60);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Create a chunker using the sizes from a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        chunk_text(&document.text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text,
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

/// How far a chunk's leading overlap may reach back to begin on a word.
const WORD_SNAP: usize = 8;

/// Whitespace between two pieces that a chunk must still have room for.
const GAP_ALLOWANCE: usize = 2;

/// Split `text` into trimmed, non-empty segments of at most `chunk_size`
/// characters using [`DEFAULT_SEPARATORS`].
///
/// Every segment is a contiguous slice of `text`. Each segment after the
/// first begins with at least the last `chunk_overlap` characters of its
/// predecessor (the whole predecessor if it is shorter), starting on a word
/// boundary when one lies within [`WORD_SNAP`] characters.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_len(trimmed) <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let reserve = WORD_SNAP + GAP_ALLOWANCE;
    let overlap = chunk_overlap.min(chunk_size.saturating_sub(reserve + 1));
    let piece_limit = if overlap == 0 { chunk_size } else { chunk_size - overlap - reserve };

    let mut pieces = Vec::new();
    split_recursive(text, 0, piece_limit, &DEFAULT_SEPARATORS, &mut pieces);
    merge_pieces(text, &pieces, chunk_size, overlap)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cut `text` into contiguous byte ranges of at most `limit` characters,
/// preferring the coarsest separator that occurs in each oversized span.
fn split_recursive(
    text: &str,
    offset: usize,
    limit: usize,
    separators: &[&str],
    out: &mut Vec<Range<usize>>,
) {
    if char_len(text) <= limit {
        out.push(offset..offset + text.len());
        return;
    }

    let Some(level) = separators.iter().position(|sep| text.contains(sep)) else {
        split_by_size(text, offset, limit, out);
        return;
    };
    let finer = &separators[level + 1..];

    let mut start = 0;
    for piece in split_keeping_separator(text, separators[level]) {
        split_recursive(piece, offset + start, limit, finer, out);
        start += piece.len();
    }
}

/// Greedily join consecutive pieces into windows of at most `chunk_size`
/// trimmed characters.
///
/// When a piece no longer fits, the window is emitted and the next one opens
/// on the tail of the emitted chunk (see [`overlap_start`]).
fn merge_pieces(
    text: &str,
    pieces: &[Range<usize>],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let fits = |start: usize, end: usize| char_len(text[start..end].trim()) <= chunk_size;

    let mut chunks = Vec::new();
    let mut last_end = 0;
    let mut window: Option<Range<usize>> = None;

    for piece in pieces {
        let current = window.clone().unwrap_or(piece.start..piece.start);
        if fits(current.start, piece.end) {
            window = Some(current.start..piece.end);
            continue;
        }

        let mut next_start = current.start;
        if !text[current.start.max(last_end)..current.end].trim().is_empty() {
            let emitted = trimmed_range(text, current);
            next_start = overlap_start(text, emitted.clone(), overlap);
            last_end = emitted.end;
            chunks.push(text[emitted].to_string());
        }

        // a long whitespace run can leave no room for the full overlap
        while next_start < piece.start && !fits(next_start, piece.end) {
            next_start += text[next_start..].chars().next().map_or(1, char::len_utf8);
        }
        window = Some(next_start..piece.end);
    }

    if let Some(current) = window {
        if !text[current.start.max(last_end)..current.end].trim().is_empty() {
            chunks.push(text[trimmed_range(text, current)].to_string());
        }
    }

    chunks
}

fn trimmed_range(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.start + slice.trim_end().len();
    start..end.max(start)
}

/// Byte offset where the chunk following `chunk` should begin.
///
/// The returned tail holds at least `overlap` characters of `chunk`, never
/// starts on whitespace, and moves back to the start of its first word when
/// that is at most [`WORD_SNAP`] characters further.
fn overlap_start(text: &str, chunk: Range<usize>, overlap: usize) -> usize {
    if overlap == 0 {
        return chunk.end;
    }
    let chars: Vec<(usize, char)> = text[chunk.clone()].char_indices().collect();
    if chars.len() <= overlap {
        return chunk.start;
    }

    let floor = chars.len().saturating_sub(overlap + WORD_SNAP);
    let mut i = chars.len() - overlap;
    while i > floor && chars[i].1.is_whitespace() {
        i -= 1;
    }
    while chars[i].1.is_whitespace() {
        i += 1;
    }

    let mut word_start = i;
    while word_start > floor && !chars[word_start - 1].1.is_whitespace() {
        word_start -= 1;
    }
    if word_start == 0 || chars[word_start - 1].1.is_whitespace() {
        i = word_start;
    }

    chunk.start + chars[i].0
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Fixed character windows, for runs with no separator left.
fn split_by_size(text: &str, offset: usize, limit: usize, out: &mut Vec<Range<usize>>) {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .step_by(limit.max(1))
        .chain(std::iter::once(text.len()))
        .collect();
    for pair in bounds.windows(2) {
        out.push(offset + pair[0]..offset + pair[1]);
    }
}
