//! Content records and the sources that provide them.
//!
//! A [`ContentSource`] yields the records of one [`Section`]. Records are
//! read-only here; the database (or the config file, for projects) owns them.
//! Each record knows how to describe itself as a single context line.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::Section;

/// Free-text fields longer than this many characters are truncated.
pub const MAX_FIELD_CHARS: usize = 500;

/// A portfolio project. Lives in the config file, not the database.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

impl Project {
    /// Lowercased text the project ranker searches.
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![self.title.as_str(), self.description.as_str()];
        for field in [&self.category, &self.budget, &self.period].into_iter().flatten() {
            parts.push(field);
        }
        for t in &self.technologies {
            parts.push(t);
        }
        parts.join(" ").to_lowercase()
    }
}

/// An approved song from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Song {
    pub title: String,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub votes: Option<i64>,
}

/// A founder or speaker video.
///
/// `name` is not read from the row directly: each video table names its
/// presenter column differently, so the table reader fills it in.
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub title: String,
    #[serde(skip_deserializing)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// A freeform personal-content entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonalContent {
    #[serde(default)]
    pub category: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// A published topic page.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicPage {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A record from any content source.
#[derive(Debug, Clone)]
pub enum ContentRecord {
    Project(Project),
    Song(Song),
    Video(Video),
    Personal(PersonalContent),
    Topic(TopicPage),
}

impl ContentRecord {
    /// One descriptive line carrying the record's salient fields.
    pub fn describe(&self) -> String {
        match self {
            ContentRecord::Project(p) => {
                let mut line = format!("Project: {}", p.title);
                if let Some(c) = &p.category {
                    line.push_str(&format!(" | Category: {}", c));
                }
                if let Some(b) = &p.budget {
                    line.push_str(&format!(" | Budget: {}", b));
                }
                if let Some(period) = &p.period {
                    line.push_str(&format!(" | Period: {}", period));
                }
                if !p.technologies.is_empty() {
                    line.push_str(&format!(" | Tech: {}", p.technologies.join(", ")));
                }
                if !p.description.is_empty() {
                    line.push_str(&format!(" | {}", truncate(&p.description)));
                }
                line
            }
            ContentRecord::Song(s) => {
                let mut line = format!("Song: {}", s.title);
                if let Some(a) = &s.artist_name {
                    line.push_str(&format!(" by {}", a));
                }
                if let Some(g) = &s.genre {
                    line.push_str(&format!(" | Genre: {}", g));
                }
                if let Some(v) = s.votes {
                    line.push_str(&format!(" | Votes: {}", v));
                }
                if let Some(d) = s.description.as_deref().filter(|d| !d.is_empty()) {
                    line.push_str(&format!(" | {}", truncate(d)));
                }
                line
            }
            ContentRecord::Video(v) => {
                let mut line = format!("Video: {}", v.title);
                if let Some(n) = &v.name {
                    line.push_str(&format!(" | Speaker: {}", n));
                }
                if let Some(d) = v.description.as_deref().filter(|d| !d.is_empty()) {
                    line.push_str(&format!(" | {}", truncate(d)));
                }
                if let Some(u) = &v.video_url {
                    line.push_str(&format!(" | URL: {}", u));
                }
                line
            }
            ContentRecord::Personal(p) => {
                let category = p.category.as_deref().unwrap_or("general");
                format!("[{}] {}: {}", category, p.title, truncate(&p.content))
            }
            ContentRecord::Topic(t) => {
                let mut line = format!("Topic: {}", t.title);
                if let Some(slug) = &t.slug {
                    line.push_str(&format!(" (/{})", slug));
                }
                if let Some(body) = t
                    .summary
                    .as_deref()
                    .or(t.content.as_deref())
                    .filter(|b| !b.is_empty())
                {
                    line.push_str(&format!(" | {}", truncate(body)));
                }
                line
            }
        }
    }
}

/// Truncate free text to [`MAX_FIELD_CHARS`] characters, marking the cut with `...`.
pub fn truncate(text: &str) -> String {
    truncate_to(text, MAX_FIELD_CHARS)
}

pub fn truncate_to(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// A provider of records for one section of the knowledge base.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short name used in logs (e.g. `"songs"`).
    fn name(&self) -> &str;

    /// The section this source's records belong to.
    fn section(&self) -> Section;

    /// Fetch all active/published records.
    async fn fetch(&self) -> Result<Vec<ContentRecord>>;
}

/// The in-process project list.
pub struct StaticProjects {
    projects: Vec<Project>,
}

impl StaticProjects {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }
}

#[async_trait]
impl ContentSource for StaticProjects {
    fn name(&self) -> &str {
        "projects"
    }

    fn section(&self) -> Section {
        Section::Projects
    }

    async fn fetch(&self) -> Result<Vec<ContentRecord>> {
        Ok(self
            .projects
            .iter()
            .cloned()
            .map(ContentRecord::Project)
            .collect())
    }
}
