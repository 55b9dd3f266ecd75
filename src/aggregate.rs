//! Multi-source context aggregation.
//!
//! Pulls records from every registered [`ContentSource`] and flattens them
//! into [`ContextLine`]s: one header per section followed by one line per
//! record. Sections always come out in [`Section`] order no matter the
//! registration order.
//!
//! A source whose fetch fails is logged and contributes only its header.
//! Aggregation itself never fails.

use serde::Serialize;
use tracing::{debug, warn};

use crate::content::{ContentRecord, ContentSource, Project};
use crate::filter::{filter_lines, rank_projects};
use crate::models::{render_lines, ContextLine};

/// The prompt-ready context returned by [`Aggregator::context_for`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub context: String,
    /// Length of `context` in characters.
    pub total_length: usize,
    pub query: String,
}

pub struct Aggregator {
    sources: Vec<Box<dyn ContentSource>>,
}

impl Aggregator {
    pub fn new(mut sources: Vec<Box<dyn ContentSource>>) -> Self {
        // Stable: two sources for the same section keep registration order.
        sources.sort_by_key(|s| s.section());
        Self { sources }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Aggregate every source into context lines.
    pub async fn aggregate(&self) -> Vec<ContextLine> {
        self.aggregate_ranked("").await
    }

    /// Aggregate, ordering the project section by relevance to `query`.
    ///
    /// Every record is kept; [`Aggregator::context_for`] applies the
    /// lexical filter afterwards.
    pub async fn aggregate_ranked(&self, query: &str) -> Vec<ContextLine> {
        let mut lines = Vec::new();

        for source in &self.sources {
            lines.push(ContextLine::Header(source.section()));

            let records = match source.fetch().await {
                Ok(records) => records,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "content source failed; section left empty");
                    continue;
                }
            };
            debug!(source = source.name(), records = records.len(), "content source loaded");

            if query.trim().is_empty() {
                lines.extend(records.iter().map(|r| ContextLine::Item(r.describe())));
            } else {
                lines.extend(ranked_items(&records, query));
            }
        }

        lines
    }

    /// Build the filtered context blob for a query.
    pub async fn context_for(&self, query: &str) -> ContextResponse {
        let lines = self.aggregate_ranked(query).await;
        let filtered = filter_lines(&lines, query);
        let context = render_lines(&filtered);

        ContextResponse {
            total_length: context.chars().count(),
            context,
            query: query.to_string(),
        }
    }
}

/// Describe records, ranking project records against the query. Records
/// of other kinds keep their source order.
fn ranked_items(records: &[ContentRecord], query: &str) -> Vec<ContextLine> {
    let projects: Vec<Project> = records
        .iter()
        .filter_map(|r| match r {
            ContentRecord::Project(p) => Some(p.clone()),
            _ => None,
        })
        .collect();

    let mut items: Vec<ContextLine> = rank_projects(&projects, query)
        .into_iter()
        .map(|p| ContextLine::Item(ContentRecord::Project(p.clone()).describe()))
        .collect();

    items.extend(
        records
            .iter()
            .filter(|r| !matches!(r, ContentRecord::Project(_)))
            .map(|r| ContextLine::Item(r.describe())),
    );
    items
}
