//! Query stage: embed a question and return the nearest indexed chunks.
//!
//! Uses the same embedding provider and namespace as ingestion. Any
//! embedding or index failure is returned to the caller; the engine never
//! turns an error into an empty result list.

use std::sync::Arc;
use tracing::debug;

use crate::embedding::{check_dims, EmbeddingProvider};
use crate::error::{ContextError, Result};
use crate::index::VectorIndex;
use crate::models::{Match, ScoredEntry};

/// Upper bound on `top_k` for a single query.
pub const MAX_TOP_K: usize = 100;

pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
    default_top_k: usize,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        namespace: impl Into<String>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
            default_top_k: default_top_k.clamp(1, MAX_TOP_K),
        }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Return up to `top_k` matches for `text`, best first.
    pub async fn query(&self, text: &str, top_k: Option<usize>) -> Result<Vec<Match>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ContextError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        let top_k = top_k.unwrap_or(self.default_top_k).clamp(1, MAX_TOP_K);
        self.embedder.ensure_ready()?;
        self.index.ensure_ready()?;

        let vector = self.embedder.embed(text).await?;
        check_dims(self.embedder.as_ref(), &vector)?;

        let hits = self
            .index
            .query(&self.namespace, &vector, top_k, true)
            .await?;
        debug!(hits = hits.len(), top_k, namespace = %self.namespace, "query answered");

        Ok(hits.into_iter().map(to_match).collect())
    }
}

/// Build a [`Match`] from index metadata. Missing fields become empty.
pub fn to_match(hit: ScoredEntry) -> Match {
    let meta = hit.metadata.unwrap_or(serde_json::Value::Null);
    let field = |key: &str| meta.get(key).and_then(|v| v.as_str()).map(str::to_string);

    Match {
        text: field("text").unwrap_or_default(),
        file_name: field("fileName").unwrap_or_default(),
        file_id: field("fileId").unwrap_or_default(),
        link: field("link"),
        mime_type: field("mimeType").unwrap_or_default(),
        chunk_index: meta
            .get("chunkIndex")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize),
        id: hit.id,
        score: hit.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledProvider;
    use crate::index::InMemoryIndex;

    #[test]
    fn match_reads_index_metadata() {
        let hit = ScoredEntry {
            id: "doc1_chunk_2".into(),
            score: 0.8,
            metadata: Some(serde_json::json!({
                "fileName": "Bio",
                "fileId": "doc1",
                "link": "https://docs.google.com/document/d/doc1",
                "mimeType": "application/vnd.google-apps.document",
                "chunkIndex": 2,
                "text": "Started producing in 2015"
            })),
        };
        let m = to_match(hit);
        assert_eq!(m.file_name, "Bio");
        assert_eq!(m.chunk_index, Some(2));
        assert_eq!(m.text, "Started producing in 2015");
        assert_eq!(m.link.as_deref(), Some("https://docs.google.com/document/d/doc1"));
    }

    #[test]
    fn match_tolerates_missing_metadata() {
        let m = to_match(ScoredEntry {
            id: "x".into(),
            score: 0.1,
            metadata: None,
        });
        assert_eq!(m.id, "x");
        assert!(m.text.is_empty());
        assert_eq!(m.link, None);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let engine = QueryEngine::new(
            Arc::new(DisabledProvider),
            Arc::new(InMemoryIndex::new()),
            "drive-docs",
            5,
        );
        assert!(matches!(
            engine.query("   ", None).await,
            Err(ContextError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let engine = QueryEngine::new(
            Arc::new(DisabledProvider),
            Arc::new(InMemoryIndex::new()),
            "drive-docs",
            5,
        );
        assert!(engine.query("what genres", None).await.is_err());
    }
}
