//! Google Drive document source.
//!
//! Lists the files of a folder through the Drive v3 REST API and extracts
//! their text according to [`export_plan`]. Listing follows
//! `nextPageToken` until every page has been read.
//!
//! # Authentication
//!
//! Requests carry an OAuth bearer token. The token is supplied per ingest
//! request or through `[drive] access_token` / `GOOGLE_DRIVE_ACCESS_TOKEN`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::DriveConfig;
use crate::error::{ContextError, Result};
use crate::extract::{export_plan, normalize_text, ExportPlan, MIME_GOOGLE_FOLDER};
use crate::models::{DocumentMetadata, SourceDocument};

/// Default Drive v3 API root.
pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,webViewLink,modifiedTime)";

/// File metadata as returned by `files.list`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveFile {
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            file_name: self.name.clone(),
            file_id: self.id.clone(),
            link: self.web_view_link.clone(),
            mime_type: self.mime_type.clone(),
            modified_time: self.modified_time.clone(),
        }
    }

    /// Pair the file with its extracted text.
    pub fn into_document(self, text: String) -> SourceDocument {
        SourceDocument {
            id: self.id.clone(),
            metadata: self.metadata(),
            text,
        }
    }
}

/// A paginated source of documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// List every file under `folder_id` (or every visible file when `None`).
    async fn list_files(&self, folder_id: Option<&str>) -> Result<Vec<DriveFile>>;

    /// Plain text of a file; empty for unsupported types.
    async fn extract_text(&self, file: &DriveFile) -> Result<String>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Drive v3 REST client bound to one access token.
pub struct DriveClient {
    api_base: String,
    access_token: String,
    page_size: u32,
    http: reqwest::Client,
}

impl DriveClient {
    pub fn new(access_token: impl Into<String>, page_size: u32) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(ContextError::ConfigurationMissing(
                "Drive access token not provided".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            api_base: DRIVE_API.to_string(),
            access_token,
            page_size: page_size.clamp(1, 1000),
            http,
        })
    }

    /// Point the client at another API root (a proxy or a local stand-in).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a client, preferring a caller-supplied token over the configured one.
    pub fn from_config(config: &DriveConfig, token_override: Option<&str>) -> Result<Self> {
        let token = token_override
            .map(str::to_string)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| config.resolved_access_token())
            .ok_or_else(|| {
                ContextError::ConfigurationMissing(
                    "Drive access token required (accessToken or GOOGLE_DRIVE_ACCESS_TOKEN)"
                        .to_string(),
                )
            })?;
        Ok(Self::new(token, config.page_size)?.with_api_base(config.api_base.as_str()))
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ContextError::Drive(format!(
                "GET {} failed (HTTP {}): {}",
                url,
                status,
                body.chars().take(500).collect::<String>()
            )));
        }
        Ok(resp.text().await?)
    }
}

/// Drive search expression for a folder listing.
pub fn list_query(folder_id: Option<&str>) -> String {
    match folder_id {
        Some(id) => format!("'{}' in parents and trashed = false", id.replace('\'', "\\'")),
        None => "trashed = false".to_string(),
    }
}

#[async_trait]
impl DocumentSource for DriveClient {
    async fn list_files(&self, folder_id: Option<&str>) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files", self.api_base);
        let q = list_query(folder_id);
        let page_size = self.page_size.to_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("q", q.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.as_str()));
            }

            let body = self.get_text(&url, &query).await?;
            let page: FileListPage = serde_json::from_str(&body)?;
            debug!(files = page.files.len(), "drive page listed");
            files.extend(
                page.files
                    .into_iter()
                    .filter(|f| f.mime_type != MIME_GOOGLE_FOLDER),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn extract_text(&self, file: &DriveFile) -> Result<String> {
        let raw = match export_plan(&file.mime_type) {
            ExportPlan::Export(target) => {
                let url = format!("{}/files/{}/export", self.api_base, file.id);
                self.get_text(&url, &[("mimeType", target)]).await?
            }
            ExportPlan::Download => {
                let url = format!("{}/files/{}", self.api_base, file.id);
                self.get_text(&url, &[("alt", "media")]).await?
            }
            ExportPlan::Unsupported => {
                debug!(file = %file.name, mime = %file.mime_type, "unsupported file type; skipping");
                return Ok(String::new());
            }
        };
        Ok(normalize_text(&raw))
    }
}

/// Include/exclude glob filter over file names, plus an optional
/// modified-since cutoff.
pub struct FileFilter {
    include: GlobSet,
    exclude: GlobSet,
    since: Option<DateTime<Utc>>,
}

impl FileFilter {
    pub fn new(include_globs: &[String], exclude_globs: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include_globs)?,
            exclude: build_globset(exclude_globs)?,
            since: None,
        })
    }

    pub fn from_config(config: &DriveConfig) -> Result<Self> {
        Self::new(&config.include_globs, &config.exclude_globs)
    }

    /// Only admit files modified on or after `date` (UTC midnight).
    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        self
    }

    pub fn allows_name(&self, file_name: &str) -> bool {
        !self.exclude.is_match(file_name) && self.include.is_match(file_name)
    }

    /// Files without a parseable `modifiedTime` pass the date cutoff.
    pub fn allows(&self, file: &DriveFile) -> bool {
        if !self.allows_name(&file.name) {
            return false;
        }
        match (self.since, file.modified_time.as_deref()) {
            (Some(cutoff), Some(ts)) => DateTime::parse_from_rfc3339(ts)
                .map(|t| t.with_timezone(&Utc) >= cutoff)
                .unwrap_or(true),
            _ => true,
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ContextError::InvalidRequest(format!("Invalid date format: '{}'. Expected YYYY-MM-DD.", value))
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ContextError::InvalidConfig(format!("invalid glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ContextError::InvalidConfig(format!("invalid glob set: {}", e)))
}
