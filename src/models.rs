//! Core data models used throughout the pipeline.
//!
//! Context lines flow from the aggregator into the relevance filter; source
//! documents flow through chunking into index entries; matches come back
//! out of the query stage.

use serde::{Deserialize, Serialize};

/// A named section of the aggregated knowledge base.
///
/// Declaration order is the order sections appear in aggregated context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Projects,
    Songs,
    FounderVideos,
    SpeakerVideos,
    PersonalContent,
    Topics,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Projects,
        Section::Songs,
        Section::FounderVideos,
        Section::SpeakerVideos,
        Section::PersonalContent,
        Section::Topics,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Section::Projects => "PROJECTS",
            Section::Songs => "SONGS",
            Section::FounderVideos => "FOUNDER VIDEOS",
            Section::SpeakerVideos => "SPEAKER VIDEOS",
            Section::PersonalContent => "PERSONAL CONTENT",
            Section::Topics => "TOPICS",
        }
    }

    /// Header line as it appears in rendered context, e.g. `=== SONGS ===`.
    pub fn header(&self) -> String {
        format!("=== {} ===", self.label())
    }
}

/// One line of aggregated context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextLine {
    Header(Section),
    Item(String),
}

impl ContextLine {
    pub fn item(text: impl Into<String>) -> Self {
        ContextLine::Item(text.into())
    }

    pub fn is_header(&self) -> bool {
        matches!(self, ContextLine::Header(_))
    }

    pub fn render(&self) -> String {
        match self {
            ContextLine::Header(section) => section.header(),
            ContextLine::Item(text) => text.clone(),
        }
    }
}

/// Render context lines into the newline-joined prompt blob.
pub fn render_lines(lines: &[ContextLine]) -> String {
    lines
        .iter()
        .map(ContextLine::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Provenance of an ingested document, copied onto every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

/// A document ready for chunking: extracted text plus provenance.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A bounded, overlapping slice of a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// `<documentId>_chunk_<index>`.
    pub id: String,
    pub source_file_id: String,
    pub text: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    pub metadata: DocumentMetadata,
}

/// Metadata persisted with each vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub document: DocumentMetadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content_hash: String,
    pub text: String,
}

/// The persisted unit in the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A raw nearest-neighbour hit as returned by a [`VectorIndex`](crate::index::VectorIndex).
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredEntry {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A search result returned from the query stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub file_name: String,
    pub file_id: String,
    pub link: Option<String>,
    pub mime_type: String,
    pub chunk_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_sort_in_declaration_order() {
        let mut sections = vec![Section::Topics, Section::Projects, Section::Songs];
        sections.sort();
        assert_eq!(
            sections,
            vec![Section::Projects, Section::Songs, Section::Topics]
        );
    }

    #[test]
    fn render_joins_headers_and_items() {
        let lines = vec![
            ContextLine::Header(Section::Songs),
            ContextLine::item("Song: Ember"),
        ];
        assert_eq!(render_lines(&lines), "=== SONGS ===\nSong: Ember");
    }

    #[test]
    fn chunk_metadata_flattens_document_fields() {
        let meta = ChunkMetadata {
            document: DocumentMetadata {
                file_name: "Bio".into(),
                file_id: "f1".into(),
                link: None,
                mime_type: "text/plain".into(),
                modified_time: None,
            },
            chunk_index: 2,
            total_chunks: 4,
            content_hash: "abc".into(),
            text: "hello".into(),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["fileName"], "Bio");
        assert_eq!(value["fileId"], "f1");
        assert_eq!(value["chunkIndex"], 2);
        assert_eq!(value["totalChunks"], 4);
        assert!(value.get("link").is_none());
    }
}
