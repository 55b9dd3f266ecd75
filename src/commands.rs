//! CLI command implementations.
//!
//! Each `run_*` function backs one `lctx` subcommand. Results go to stdout;
//! diagnostics go through `tracing` to stderr.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::app::App;
use crate::chunk::{chunk_document, ChunkParams};
use crate::config::Config;
use crate::drive::{parse_date, DriveClient, FileFilter};
use crate::models::{DocumentMetadata, SourceDocument};
use crate::progress::ProgressMode;

/// Print the aggregated, relevance-filtered context.
pub async fn run_context(config: &Config, query: Option<&str>) -> Result<()> {
    let app = App::from_config(config)?;
    let response = app.aggregator.context_for(query.unwrap_or("")).await;

    println!("{}", response.context);
    eprintln!("({} chars)", response.total_length);
    Ok(())
}

/// Dry-run the chunker over a local file.
pub fn run_chunk(
    config: &Config,
    path: &Path,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let params = ChunkParams::new(
        chunk_size.unwrap_or(config.chunking.chunk_size),
        overlap.unwrap_or(config.chunking.overlap),
    )?;

    let file_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let doc = SourceDocument {
        id: file_name.clone(),
        text,
        metadata: DocumentMetadata {
            file_name,
            file_id: path.display().to_string(),
            link: None,
            mime_type: "text/plain".to_string(),
            modified_time: None,
        },
    };

    let chunks = chunk_document(&doc, params);
    if chunks.is_empty() {
        println!("No chunks.");
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "{}  chars: {}  hash: {}",
            chunk.id,
            chunk.text.chars().count(),
            &chunk.hash[..12]
        );
    }
    println!(
        "{} chunks (chunk_size: {}, overlap: {})",
        chunks.len(),
        params.chunk_size(),
        params.overlap()
    );
    Ok(())
}

/// Ingest a Drive folder into the configured index.
pub async fn run_ingest(
    config: &Config,
    folder_id: Option<String>,
    access_token: Option<String>,
    since: Option<String>,
    progress: ProgressMode,
) -> Result<()> {
    let folder_id = folder_id.or_else(|| config.drive.folder_id.clone());
    let Some(folder_id) = folder_id else {
        bail!("No folder to ingest. Pass --folder-id or set [drive] folder_id.");
    };
    if !config.embedding.is_enabled() {
        bail!("Ingest requires embeddings. Set [embedding] provider in config.");
    }

    let mut filter = FileFilter::from_config(&config.drive)?;
    if let Some(since) = since.as_deref() {
        filter = filter.since(parse_date(since)?);
    }

    let app = App::from_config(config)?;
    let ingestor = app.ingestor()?;
    let client = DriveClient::from_config(&config.drive, access_token.as_deref())?;
    let reporter = progress.reporter();

    let started = chrono::Utc::now();
    let report = ingestor
        .ingest_drive(&client, Some(&folder_id), &filter, reporter.as_ref())
        .await?;
    let elapsed = chrono::Utc::now() - started;

    println!("ingest {}", folder_id);
    println!("  files listed: {}", report.files_listed);
    println!("  documents processed: {}", report.documents_processed);
    println!("  documents skipped: {}", report.documents_skipped);
    println!("  chunks created: {}", report.chunks_created);
    println!(
        "  batches: {} ({} failed, {} chunks lost)",
        report.batches, report.failed_batches, report.chunks_failed
    );
    println!("  model: {}", ingestor.model_name());
    println!("  namespace: {}", ingestor.namespace());
    println!("  elapsed: {}.{:03}s", elapsed.num_seconds(), elapsed.num_milliseconds() % 1000);

    if report.failed_batches > 0 && report.chunks_created == 0 {
        bail!("Every batch failed; nothing was indexed.");
    }
    Ok(())
}

/// Run a semantic query and print ranked matches.
pub async fn run_query(config: &Config, text: &str, top_k: Option<usize>) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Query requires embeddings. Set [embedding] provider in config.");
    }

    let app = App::from_config(config)?;
    let matches = app.query.query(text, top_k).await?;

    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, m) in matches.iter().enumerate() {
        println!("{}. [{:.2}] {}", i + 1, m.score, m.file_name);
        println!("    id: {}", m.id);
        if let Some(link) = &m.link {
            println!("    link: {}", link);
        }
        let excerpt: String = m.text.chars().take(200).collect();
        println!("    > {}", excerpt.replace('\n', " "));
        println!();
    }
    Ok(())
}
