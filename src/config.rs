//! TOML configuration.
//!
//! Every external collaborator (embedding API, vector index, Supabase, Drive)
//! is configured here and constructed explicitly from these structs; nothing
//! reads process-wide state after start-up. Secrets may be left out of the
//! file and supplied through environment variables instead:
//!
//! | Field | Env fallback |
//! |-------|--------------|
//! | `embedding.api_key` | `OPENAI_API_KEY` |
//! | `index.api_key` | `PINECONE_API_KEY` |
//! | `content.supabase_url` | `SUPABASE_URL` |
//! | `content.supabase_key` | `SUPABASE_SERVICE_ROLE_KEY` |
//! | `drive.access_token` | `GOOGLE_DRIVE_ACCESS_TOKEN` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::chunk::ChunkParams;
use crate::content::Project;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub drive: DriveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Chunks embedded and upserted per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            batch_size: default_batch_size(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkParams> {
        Ok(ChunkParams::new(self.chunk_size, self.overlap)?)
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}
fn default_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            api_key: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// API key from config, falling back to `OPENAI_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_provider")]
    pub provider: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Data-plane host. Resolved through the control plane when absent.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_index_provider(),
            index_name: default_index_name(),
            namespace: default_namespace(),
            host: None,
            api_key: None,
        }
    }
}

fn default_index_provider() -> String {
    "memory".to_string()
}
fn default_index_name() -> String {
    "portfolio".to_string()
}
fn default_namespace() -> String {
    "drive-docs".to_string()
}

impl IndexConfig {
    /// API key from config, falling back to `PINECONE_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("PINECONE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContentConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_key: Option<String>,
    /// The in-process project list.
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl ContentConfig {
    pub fn resolved_supabase_url(&self) -> Option<String> {
        self.supabase_url
            .clone()
            .or_else(|| std::env::var("SUPABASE_URL").ok())
            .filter(|u| !u.trim().is_empty())
    }

    pub fn resolved_supabase_key(&self) -> Option<String> {
        self.supabase_key
            .clone()
            .or_else(|| std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Drive v3 API root.
    #[serde(default = "default_drive_api_base")]
    pub api_base: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: None,
            access_token: None,
            page_size: default_page_size(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            api_base: default_drive_api_base(),
        }
    }
}

fn default_drive_api_base() -> String {
    crate::drive::DRIVE_API.to_string()
}

fn default_page_size() -> u32 {
    100
}
fn default_include_globs() -> Vec<String> {
    vec!["**".to_string()]
}

impl DriveConfig {
    /// Access token from config, falling back to `GOOGLE_DRIVE_ACCESS_TOKEN`.
    pub fn resolved_access_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| std::env::var("GOOGLE_DRIVE_ACCESS_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }
}

impl Config {
    /// A config with every collaborator disabled, for commands that can run
    /// without a config file.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8787".to_string(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            content: ContentConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    config
        .chunking
        .params()
        .with_context(|| "Invalid [chunking] section")?;
    if config.chunking.batch_size == 0 {
        anyhow::bail!("chunking.batch_size must be > 0");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    // Validate index
    match config.index.provider.as_str() {
        "memory" | "pinecone" => {}
        other => anyhow::bail!(
            "Unknown index provider: '{}'. Must be memory or pinecone.",
            other
        ),
    }
    if config.index.namespace.trim().is_empty() {
        anyhow::bail!("index.namespace must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[server]
bind = "127.0.0.1:8787"
"#;

    #[test]
    fn defaults_apply() {
        let cfg = parse_config(BASE).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.chunking.batch_size, 100);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.index.provider, "memory");
        assert_eq!(cfg.index.namespace, "drive-docs");
        assert!(!cfg.embedding.is_enabled());
        assert!(cfg.content.projects.is_empty());
    }

    #[test]
    fn overlap_not_smaller_than_chunk_size_is_rejected() {
        let toml = format!("{}\n[chunking]\nchunk_size = 100\noverlap = 100\n", BASE);
        let err = parse_config(&toml).unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }

    #[test]
    fn openai_requires_model_and_dims() {
        let toml = format!("{}\n[embedding]\nprovider = \"openai\"\n", BASE);
        assert!(parse_config(&toml).is_err());

        let toml = format!(
            "{}\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
            BASE
        );
        let cfg = parse_config(&toml).unwrap();
        assert_eq!(cfg.embedding.dims, Some(1536));
    }

    #[test]
    fn unknown_providers_are_rejected() {
        let toml = format!("{}\n[index]\nprovider = \"faiss\"\n", BASE);
        assert!(parse_config(&toml).is_err());
        let toml = format!("{}\n[embedding]\nprovider = \"cohere\"\n", BASE);
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn projects_parse_from_tables() {
        let toml = format!(
            r#"{}
[[content.projects]]
title = "LaunchThatSong"
description = "Crowdfunding for unreleased songs"
category = "Web"
budget = "$12k"
period = "2024"
technologies = ["Next.js", "Supabase"]
"#,
            BASE
        );
        let cfg = parse_config(&toml).unwrap();
        assert_eq!(cfg.content.projects.len(), 1);
        assert_eq!(cfg.content.projects[0].technologies.len(), 2);
    }

    #[test]
    fn explicit_key_wins_over_env() {
        let cfg = EmbeddingConfig {
            api_key: Some("sk-from-file".into()),
            ..EmbeddingConfig::default()
        };
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("sk-from-file"));
    }
}
