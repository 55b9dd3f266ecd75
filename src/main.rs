//! # Launch Context CLI (`lctx`)
//!
//! Command-line front end for the context pipeline: print aggregated
//! context, dry-run the chunker, ingest a Drive folder, run semantic
//! queries, and start the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! lctx --config ./config/lctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lctx context` | Print aggregated, relevance-filtered context |
//! | `lctx chunk <file>` | Show how a local file would be chunked |
//! | `lctx ingest` | Ingest a Drive folder into the vector index |
//! | `lctx query "<text>"` | Nearest-neighbour search over ingested chunks |
//! | `lctx serve` | Start the HTTP server |
//! | `lctx completions <shell>` | Print shell completions |
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use launch_context::{commands, config, progress::ProgressMode, server};

/// Launch Context CLI: context aggregation, Drive ingestion, and semantic
/// query for the LaunchThatSong assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lctx.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "lctx", version, about = "Launch Context: retrieval core for the LaunchThatSong assistant")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lctx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print aggregated context, optionally filtered by a query.
    ///
    /// Unavailable content sources show up as empty sections.
    Context {
        #[arg(long)]
        query: Option<String>,
    },

    /// Chunk a local text file and print chunk ids, sizes, and hashes.
    ///
    /// Runs without a config file; chunking defaults apply.
    Chunk {
        /// Path to a UTF-8 text file.
        path: PathBuf,

        /// Override `[chunking] chunk_size`.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Override `[chunking] overlap`.
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Ingest a Google Drive folder.
    ///
    /// Lists the folder, extracts text, chunks it, embeds every chunk, and
    /// upserts batches into the vector index.
    Ingest {
        /// Drive folder id. Defaults to `[drive] folder_id`.
        #[arg(long)]
        folder_id: Option<String>,

        /// OAuth access token. Defaults to `[drive] access_token` or
        /// `GOOGLE_DRIVE_ACCESS_TOKEN`.
        #[arg(long)]
        access_token: Option<String>,

        /// Only ingest files modified on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Progress on stderr: `off`, `human`, or `json`. Defaults to
        /// `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Search ingested documents.
    Query {
        text: String,

        /// Number of matches (1-100). Defaults to `[retrieval] top_k`.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the HTTP server on `[server] bind`.
    Serve,

    /// Print shell completions.
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "lctx", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Chunk {
            path,
            chunk_size,
            overlap,
        } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            commands::run_chunk(&cfg, path, *chunk_size, *overlap)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Context { query } => {
            commands::run_context(&cfg, query.as_deref()).await?;
        }
        Commands::Ingest {
            folder_id,
            access_token,
            since,
            progress,
        } => {
            let mode = match progress.as_deref() {
                Some(value) => ProgressMode::parse(value).ok_or_else(|| {
                    anyhow::anyhow!("Unknown progress mode: {}. Use off, human, or json.", value)
                })?,
                None => ProgressMode::default_for_tty(),
            };
            commands::run_ingest(&cfg, folder_id, access_token, since, mode).await?;
        }
        Commands::Query { text, top_k } => {
            commands::run_query(&cfg, &text, top_k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } | Commands::Chunk { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}
