//! Fixed-window text chunker with overlap.
//!
//! Splits document text into [`DocumentChunk`]s of at most `chunk_size`
//! characters. Consecutive windows share `overlap` characters so a sentence
//! cut at a boundary is still seen whole by one of the two chunks.
//!
//! Each chunk receives a deterministic id derived from its document id and
//! index, plus a SHA-256 hash of its text for staleness detection.

use sha2::{Digest, Sha256};

use crate::error::{ContextError, Result};
use crate::models::{DocumentChunk, SourceDocument};

/// Validated chunk window parameters.
///
/// Construction rejects `overlap >= chunk_size`, which would stop the window
/// from advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ContextError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ContextError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Split text into overlapping windows.
///
/// Windows start at 0 and advance by `chunk_size - overlap` until the start
/// passes the end of the text. Lengths are counted in characters.
/// Whitespace-only text yields no windows.
pub fn split_text(text: &str, params: ChunkParams) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut windows = Vec::with_capacity(len / params.step() + 1);
    let mut start = 0;

    while start < len {
        let end = (start + params.chunk_size).min(len);
        windows.push(chars[start..end].iter().collect());
        start += params.step();
    }

    windows
}

/// Chunk a document, attaching provenance to every piece.
///
/// Returns an empty vector for documents with no extractable text.
pub fn chunk_document(doc: &SourceDocument, params: ChunkParams) -> Vec<DocumentChunk> {
    let windows = split_text(&doc.text, params);
    let total = windows.len();

    windows
        .into_iter()
        .enumerate()
        .map(|(index, text)| make_chunk(doc, index, total, text))
        .collect()
}

/// Composite id for a chunk of a document.
pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{}_chunk_{}", document_id, index)
}

fn make_chunk(doc: &SourceDocument, index: usize, total: usize, text: String) -> DocumentChunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    DocumentChunk {
        id: chunk_id(&doc.id, index),
        source_file_id: doc.id.clone(),
        text,
        chunk_index: index,
        total_chunks: total,
        hash,
        metadata: doc.metadata.clone(),
    }
}
