//! Supabase-backed content sources.
//!
//! Reads rows through the PostgREST endpoint that Supabase exposes at
//! `{url}/rest/v1/{table}`. Each [`SupabaseSource`] maps one table (plus its
//! "active/published" filter) onto one [`Section`].
//!
//! # Tables
//!
//! | Section | Table | Filter | Order |
//! |---------|-------|--------|-------|
//! | Songs | `songs` | `status=eq.approved` | `created_at.desc` |
//! | Founder videos | `founder_videos` | `is_active=eq.true` | `created_at.desc` |
//! | Speaker videos | `speaker_videos` | `is_active=eq.true` | `created_at.desc` |
//! | Personal content | `personal_content` | `is_published=eq.true` | `created_at.desc` |
//! | Topics | `topics` | `is_published=eq.true` | `title.asc` |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ContentConfig;
use crate::content::{ContentRecord, ContentSource, Video};
use crate::error::{ContextError, Result};
use crate::models::Section;

/// Thin PostgREST client.
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    /// Build a client from config, or `None` when Supabase is not configured.
    pub fn from_config(config: &ContentConfig) -> Result<Option<Self>> {
        match (
            config.resolved_supabase_url(),
            config.resolved_supabase_key(),
        ) {
            (Some(url), Some(key)) => Ok(Some(Self::new(url, key)?)),
            _ => Ok(None),
        }
    }

    /// Fetch all rows of `table` matching a PostgREST `filter` (`column=op.value`),
    /// sorted by `order` (`column.asc|desc`).
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &str,
        order: &str,
    ) -> Result<Vec<T>> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let (column, condition) = filter.split_once('=').unwrap_or((filter, ""));

        let resp = self
            .http
            .get(&url)
            .query(&[("select", "*"), ("order", order), (column, condition)])
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ContextError::SourceUnavailable {
                source_name: table.to_string(),
                message: format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(300).collect::<String>()
                ),
            });
        }

        Ok(resp.json::<Vec<T>>().await?)
    }
}

/// Which table a [`SupabaseSource`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Songs,
    FounderVideos,
    SpeakerVideos,
    PersonalContent,
    Topics,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Songs,
        Table::FounderVideos,
        Table::SpeakerVideos,
        Table::PersonalContent,
        Table::Topics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::FounderVideos => "founder_videos",
            Table::SpeakerVideos => "speaker_videos",
            Table::PersonalContent => "personal_content",
            Table::Topics => "topics",
        }
    }

    pub fn filter(&self) -> &'static str {
        match self {
            Table::Songs => "status=eq.approved",
            Table::FounderVideos | Table::SpeakerVideos => "is_active=eq.true",
            Table::PersonalContent | Table::Topics => "is_published=eq.true",
        }
    }

    /// PostgREST `order` value; the column must exist on the table.
    pub fn order(&self) -> &'static str {
        match self {
            Table::Topics => "title.asc",
            _ => "created_at.desc",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Table::Songs => Section::Songs,
            Table::FounderVideos => Section::FounderVideos,
            Table::SpeakerVideos => Section::SpeakerVideos,
            Table::PersonalContent => Section::PersonalContent,
            Table::Topics => Section::Topics,
        }
    }
}

#[derive(Deserialize)]
struct FounderVideoRow {
    #[serde(default)]
    founder_name: Option<String>,
    #[serde(flatten)]
    video: Video,
}

impl From<FounderVideoRow> for Video {
    fn from(row: FounderVideoRow) -> Self {
        Video {
            name: row.founder_name,
            ..row.video
        }
    }
}

#[derive(Deserialize)]
struct SpeakerVideoRow {
    #[serde(default)]
    speaker_name: Option<String>,
    #[serde(flatten)]
    video: Video,
}

impl From<SpeakerVideoRow> for Video {
    fn from(row: SpeakerVideoRow) -> Self {
        Video {
            name: row.speaker_name,
            ..row.video
        }
    }
}

/// A content source reading one Supabase table.
///
/// Without a client every fetch fails with
/// [`ConfigurationMissing`](ContextError::ConfigurationMissing); the
/// aggregator turns that into an empty section.
pub struct SupabaseSource {
    client: Option<Arc<SupabaseClient>>,
    table: Table,
}

impl SupabaseSource {
    pub fn new(client: Option<Arc<SupabaseClient>>, table: Table) -> Self {
        Self { client, table }
    }

    /// One source per table, all sharing the same client.
    pub fn all(client: Option<Arc<SupabaseClient>>) -> Vec<Self> {
        Table::ALL
            .iter()
            .map(|t| Self::new(client.clone(), *t))
            .collect()
    }
}

#[async_trait]
impl ContentSource for SupabaseSource {
    fn name(&self) -> &str {
        self.table.name()
    }

    fn section(&self) -> Section {
        self.table.section()
    }

    async fn fetch(&self) -> Result<Vec<ContentRecord>> {
        let client = self.client.as_ref().ok_or_else(|| {
            ContextError::ConfigurationMissing(
                "SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set".to_string(),
            )
        })?;

        let name = self.table.name();
        let filter = self.table.filter();
        let order = self.table.order();
        let records: Vec<ContentRecord> = match self.table {
            Table::Songs => client
                .select(name, filter, order)
                .await?
                .into_iter()
                .map(ContentRecord::Song)
                .collect(),
            Table::FounderVideos => client
                .select::<FounderVideoRow>(name, filter, order)
                .await?
                .into_iter()
                .map(|row| ContentRecord::Video(row.into()))
                .collect(),
            Table::SpeakerVideos => client
                .select::<SpeakerVideoRow>(name, filter, order)
                .await?
                .into_iter()
                .map(|row| ContentRecord::Video(row.into()))
                .collect(),
            Table::PersonalContent => client
                .select(name, filter, order)
                .await?
                .into_iter()
                .map(ContentRecord::Personal)
                .collect(),
            Table::Topics => client
                .select(name, filter, order)
                .await?
                .into_iter()
                .map(ContentRecord::Topic)
                .collect(),
        };

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::RawQuery, routing::get, Json, Router};
    use std::sync::Mutex;

    /// Serve `rows` for every table and record each query string.
    async fn stub(rows: serde_json::Value) -> (String, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let app = Router::new().route(
            "/rest/v1/{table}",
            get(move |RawQuery(q): RawQuery| {
                let log = log.clone();
                let rows = rows.clone();
                async move {
                    log.lock().unwrap().push(q.unwrap_or_default());
                    Json(rows)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    #[test]
    fn video_rows_read_their_own_presenter_column() {
        let row = serde_json::json!({
            "title": "Keynote",
            "speaker_name": "Ada",
            "founder_name": "Grace",
            "video_url": "https://youtu.be/x"
        });
        let founder: Video = serde_json::from_value::<FounderVideoRow>(row.clone())
            .unwrap()
            .into();
        let speaker: Video = serde_json::from_value::<SpeakerVideoRow>(row).unwrap().into();
        assert_eq!(founder.name.as_deref(), Some("Grace"));
        assert_eq!(speaker.name.as_deref(), Some("Ada"));
        assert_eq!(speaker.video_url.as_deref(), Some("https://youtu.be/x"));
    }

    #[tokio::test]
    async fn fetch_sends_table_filter_and_order() {
        let (base, seen) = stub(serde_json::json!([
            {"title": "Pitch", "founder_name": "Sam", "created_at": "2024-01-01"}
        ]))
        .await;
        let client = Arc::new(SupabaseClient::new(base, "key").unwrap());

        let records = SupabaseSource::new(Some(client.clone()), Table::FounderVideos)
            .fetch()
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].describe(), "Video: Pitch | Speaker: Sam");

        SupabaseSource::new(Some(client), Table::Topics)
            .fetch()
            .await
            .unwrap();

        let queries = seen.lock().unwrap().clone();
        assert!(queries[0].contains("order=created_at.desc"));
        assert!(queries[0].contains("is_active=eq.true"));
        assert!(queries[1].contains("order=title.asc"));
        assert!(queries[1].contains("is_published=eq.true"));
    }

    #[test]
    fn every_table_maps_to_a_distinct_section() {
        let mut sections: Vec<Section> = Table::ALL.iter().map(|t| t.section()).collect();
        sections.dedup();
        assert_eq!(sections.len(), 5);
        assert!(!sections.contains(&Section::Projects));
    }

    #[test]
    fn filters_are_postgrest_conditions() {
        for t in Table::ALL {
            let (col, cond) = t.filter().split_once('=').unwrap();
            assert!(!col.is_empty());
            assert!(cond.starts_with("eq."));
        }
    }

    #[tokio::test]
    async fn unconfigured_source_reports_configuration_missing() {
        let source = SupabaseSource::new(None, Table::Songs);
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, ContextError::ConfigurationMissing(_)));
    }

    #[test]
    fn from_config_without_url_is_none() {
        let cfg = ContentConfig {
            supabase_url: Some(String::new()),
            supabase_key: Some("key".into()),
            projects: Vec::new(),
        };
        assert!(SupabaseClient::from_config(&cfg).unwrap().is_none());
    }
}
