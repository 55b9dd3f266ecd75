//! # Launch Context
//!
//! Retrieval core for the LaunchThatSong chat assistant.
//!
//! Turns the site's structured content (projects, songs, videos, personal
//! pages, topics) into a relevance-filtered context blob, ingests Google
//! Drive documents into a vector index as overlapping embedded chunks, and
//! answers semantic queries against that index.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌──────────┐
//! │ Content      │──▶│ Aggregator │──▶│ Relevance│──▶ context blob
//! │ Static/Supa. │   │            │   │ Filter   │
//! └──────────────┘   └────────────┘   └──────────┘
//!
//! ┌──────────────┐   ┌────────────┐   ┌──────────┐   ┌──────────┐
//! │ Drive        │──▶│ Chunker    │──▶│ Embedder │──▶│ Vector   │
//! │ list+export  │   │            │   │ (batched)│   │ Index    │
//! └──────────────┘   └────────────┘   └──────────┘   └────┬─────┘
//!                                                         │
//!                                 query ──▶ Embedder ─────┘──▶ matches
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lctx context --query "jazz production"
//! lctx chunk ./bio.txt --chunk-size 1000 --overlap 200
//! lctx ingest --folder-id 1AbC... --progress human
//! lctx query "what did the founder study"
//! lctx serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Library error type |
//! | [`models`] | Core data types |
//! | [`content`] | Content records and the `ContentSource` trait |
//! | [`supabase`] | Supabase-backed content sources |
//! | [`aggregate`] | Multi-source context aggregation |
//! | [`filter`] | Relevance filter and project ranking |
//! | [`chunk`] | Overlapping text chunking |
//! | [`batch`] | Fixed-size batching iterator adapter |
//! | [`extract`] | Drive export plans by MIME type |
//! | [`drive`] | Google Drive document source |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index abstraction |
//! | [`ingest`] | Chunk-and-embed ingestion pipeline |
//! | [`query`] | Semantic query stage |
//! | [`progress`] | Ingest progress reporting |
//! | [`app`] | Component wiring |
//! | [`server`] | HTTP server |
//! | [`commands`] | CLI command implementations |

pub mod aggregate;
pub mod app;
pub mod batch;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod content;
pub mod drive;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod filter;
pub mod index;
pub mod ingest;
pub mod models;
pub mod progress;
pub mod query;
pub mod server;
pub mod supabase;
