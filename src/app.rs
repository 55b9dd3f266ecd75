//! Component wiring.
//!
//! Builds every collaborator from a [`Config`] exactly once. The embedding
//! provider and vector index are shared by [`Ingestor`] and [`QueryEngine`]
//! so both paths embed with the same model into the same namespace.
//!
//! A provider or index that cannot be built for lack of credentials does
//! not stop the app: context aggregation needs neither, so the missing
//! client is replaced by a placeholder that fails ingest and query with
//! [`ContextError::ConfigurationMissing`].

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::content::{ContentSource, StaticProjects};
use crate::embedding::{create_provider, EmbeddingProvider, UnavailableProvider};
use crate::error::ContextError;
use crate::index::{create_index, UnavailableIndex, VectorIndex};
use crate::ingest::Ingestor;
use crate::query::QueryEngine;
use crate::supabase::{SupabaseClient, SupabaseSource};

/// Fully-wired pipeline components.
pub struct App {
    pub config: Arc<Config>,
    pub aggregator: Arc<Aggregator>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub query: Arc<QueryEngine>,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = match create_provider(&config.embedding) {
            Ok(provider) => provider,
            Err(ContextError::ConfigurationMissing(reason)) => {
                warn!(reason = %reason, "embedding provider unavailable; ingest and query will fail");
                Arc::new(UnavailableProvider::new(reason))
            }
            Err(e) => return Err(e).with_context(|| "Failed to create embedding provider"),
        };
        let index: Arc<dyn VectorIndex> = match create_index(&config.index) {
            Ok(index) => index,
            Err(ContextError::ConfigurationMissing(reason)) => {
                warn!(reason = %reason, "vector index unavailable; ingest and query will fail");
                Arc::new(UnavailableIndex::new(reason))
            }
            Err(e) => return Err(e).with_context(|| "Failed to create vector index"),
        };
        Self::with_clients(config, embedder, index)
    }

    /// Wire the app around injected clients.
    pub fn with_clients(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let supabase = SupabaseClient::from_config(&config.content)
            .with_context(|| "Failed to create Supabase client")?
            .map(Arc::new);

        let mut sources: Vec<Box<dyn ContentSource>> = vec![Box::new(StaticProjects::new(
            config.content.projects.clone(),
        ))];
        for source in SupabaseSource::all(supabase) {
            sources.push(Box::new(source));
        }

        let query = QueryEngine::new(
            embedder.clone(),
            index.clone(),
            config.index.namespace.clone(),
            config.retrieval.top_k,
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            aggregator: Arc::new(Aggregator::new(sources)),
            embedder,
            index,
            query: Arc::new(query),
        })
    }

    /// An ingestor sharing this app's embedder, index, and namespace.
    pub fn ingestor(&self) -> Result<Ingestor> {
        let params = self
            .config
            .chunking
            .params()
            .with_context(|| "Invalid [chunking] section")?;
        Ok(Ingestor::new(
            self.embedder.clone(),
            self.index.clone(),
            self.config.index.namespace.clone(),
            params,
            self.config.chunking.batch_size,
        ))
    }
}
