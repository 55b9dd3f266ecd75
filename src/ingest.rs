//! Chunk-and-embed ingestion pipeline.
//!
//! Coordinates the flow: document source → extraction → chunking →
//! embedding → batched upsert into the vector index.
//!
//! Batches are processed strictly one after another. Inside a batch every
//! chunk is embedded concurrently, then the whole batch is upserted in one
//! call. A failed batch is logged and skipped; earlier batches stay in the
//! index and later batches still run, so the report may describe a partial
//! ingestion.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::batch::BatchExt;
use crate::chunk::{chunk_document, ChunkParams};
use crate::drive::{DocumentSource, FileFilter};
use crate::embedding::{check_dims, EmbeddingProvider};
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::{ChunkMetadata, DocumentChunk, IndexEntry, SourceDocument};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};

/// Characters of chunk text stored in index metadata.
pub const METADATA_TEXT_CHARS: usize = 1000;

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Files returned by the document source (Drive runs only).
    pub files_listed: usize,
    /// Documents that produced at least one chunk.
    pub documents_processed: usize,
    /// Documents skipped for empty, unsupported, or unreadable content.
    pub documents_skipped: usize,
    /// Chunks successfully upserted.
    pub chunks_created: usize,
    /// Chunks lost to failed batches.
    pub chunks_failed: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
    params: ChunkParams,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        namespace: impl Into<String>,
        params: ChunkParams,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
            params,
            batch_size: batch_size.max(1),
        }
    }

    /// Model identifier used for every chunk this ingestor embeds.
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fails with [`ContextError::ConfigurationMissing`](crate::error::ContextError::ConfigurationMissing)
    /// when the embedder or index cannot be used at all.
    pub fn ensure_ready(&self) -> Result<()> {
        self.embedder.ensure_ready()?;
        self.index.ensure_ready()
    }

    /// Chunk, embed, and upsert documents.
    pub async fn ingest(
        &self,
        documents: &[SourceDocument],
        progress: &dyn IngestProgressReporter,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        let mut chunks: Vec<DocumentChunk> = Vec::new();

        for doc in documents {
            let doc_chunks = chunk_document(doc, self.params);
            if doc_chunks.is_empty() {
                report.documents_skipped += 1;
                continue;
            }
            report.documents_processed += 1;
            chunks.extend(doc_chunks);
        }

        let total_batches = chunks.len().div_ceil(self.batch_size);
        info!(
            documents = report.documents_processed,
            chunks = chunks.len(),
            batches = total_batches,
            namespace = %self.namespace,
            model = self.embedder.model_name(),
            "ingesting chunks"
        );

        for (n, batch) in chunks.into_iter().batched(self.batch_size).enumerate() {
            report.batches += 1;
            let size = batch.len();

            let ok = match self.upsert_batch(&batch).await {
                Ok(written) => {
                    report.chunks_created += written;
                    true
                }
                Err(e) => {
                    warn!(batch = n + 1, chunks = size, error = %e, "batch failed; continuing with next batch");
                    report.failed_batches += 1;
                    report.chunks_failed += size;
                    false
                }
            };

            progress.report(IngestProgressEvent::Upserting {
                batch: (n + 1) as u64,
                total_batches: total_batches as u64,
                ok,
            });
        }

        info!(
            chunks_created = report.chunks_created,
            failed_batches = report.failed_batches,
            "ingest finished"
        );
        report
    }

    /// List, filter, and extract every file from `source`, then ingest them.
    ///
    /// Missing embedding or index configuration and listing errors are
    /// fatal; both are checked before any file is read. A file whose text
    /// cannot be fetched is logged and skipped.
    pub async fn ingest_drive(
        &self,
        source: &dyn DocumentSource,
        folder_id: Option<&str>,
        filter: &FileFilter,
        progress: &dyn IngestProgressReporter,
    ) -> Result<IngestReport> {
        self.ensure_ready()?;
        progress.report(IngestProgressEvent::Listing {
            source: folder_id.unwrap_or("drive").to_string(),
        });

        let files = source.list_files(folder_id).await?;
        let files_listed = files.len();
        let mut documents = Vec::new();
        let mut unreadable = 0;

        for (n, file) in files.into_iter().enumerate() {
            progress.report(IngestProgressEvent::Extracting {
                n: (n + 1) as u64,
                total: files_listed as u64,
            });

            if !filter.allows(&file) {
                unreadable += 1;
                continue;
            }

            match source.extract_text(&file).await {
                Ok(text) => documents.push(file.into_document(text)),
                Err(e) => {
                    warn!(file = %file.name, error = %e, "failed to extract file; skipping");
                    unreadable += 1;
                }
            }
        }

        let mut report = self.ingest(&documents, progress).await;
        report.files_listed = files_listed;
        report.documents_skipped += unreadable;
        Ok(report)
    }

    async fn upsert_batch(&self, batch: &[DocumentChunk]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut entries = Vec::with_capacity(batch.len());
        for (chunk, values) in batch.iter().zip(vectors) {
            check_dims(self.embedder.as_ref(), &values)?;
            entries.push(index_entry(chunk, values)?);
        }

        self.index.upsert(&self.namespace, &entries).await
    }
}

/// Build the persisted entry for a chunk.
pub fn index_entry(chunk: &DocumentChunk, values: Vec<f32>) -> Result<IndexEntry> {
    let metadata = ChunkMetadata {
        document: chunk.metadata.clone(),
        chunk_index: chunk.chunk_index,
        total_chunks: chunk.total_chunks,
        content_hash: chunk.hash.clone(),
        text: chunk.text.chars().take(METADATA_TEXT_CHARS).collect(),
    };

    Ok(IndexEntry {
        id: chunk.id.clone(),
        values,
        metadata: serde_json::to_value(metadata)?,
    })
}
