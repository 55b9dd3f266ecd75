//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait covers the two calls the pipeline needs:
//! upserting entries into a namespace and querying a namespace by vector.
//!
//! | Implementation | Use |
//! |----------------|-----|
//! | [`InMemoryIndex`] | Tests and `index.provider = "memory"`; brute-force cosine |
//! | [`PineconeIndex`] | Pinecone data-plane REST API |
//! | [`UnavailableIndex`] | Placeholder when the configured index cannot be built |

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::IndexConfig;
use crate::embedding::cosine_similarity;
use crate::error::{ContextError, Result};
use crate::models::{IndexEntry, ScoredEntry};

/// Abstract namespaced vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Fails when the index cannot be reached at all, before any work starts.
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Insert or replace entries by id. Returns the number written.
    async fn upsert(&self, namespace: &str, entries: &[IndexEntry]) -> Result<usize>;

    /// Return up to `top_k` nearest entries, best first.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>>;
}

// ============ In-memory ============

struct StoredVector {
    values: Vec<f32>,
    metadata: serde_json::Value,
}

/// In-memory index for tests and local runs.
///
/// Namespaces are independent maps behind a `std::sync::RwLock`.
pub struct InMemoryIndex {
    namespaces: RwLock<HashMap<String, HashMap<String, StoredVector>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries stored in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .map(|ns| ns.get(namespace).map(HashMap::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn contains(&self, namespace: &str, id: &str) -> bool {
        self.namespaces
            .read()
            .map(|ns| ns.get(namespace).is_some_and(|m| m.contains_key(id)))
            .unwrap_or(false)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> ContextError {
    ContextError::Index("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, namespace: &str, entries: &[IndexEntry]) -> Result<usize> {
        let mut namespaces = self.namespaces.write().map_err(|_| poisoned())?;
        let ns = namespaces.entry(namespace.to_string()).or_default();
        for e in entries {
            ns.insert(
                e.id.clone(),
                StoredVector {
                    values: e.values.clone(),
                    metadata: e.metadata.clone(),
                },
            );
        }
        Ok(entries.len())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>> {
        let namespaces = self.namespaces.read().map_err(|_| poisoned())?;
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<ScoredEntry> = ns
            .iter()
            .map(|(id, sv)| ScoredEntry {
                id: id.clone(),
                score: cosine_similarity(vector, &sv.values),
                metadata: include_metadata.then(|| sv.metadata.clone()),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

// ============ Pinecone ============

const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";

/// Pinecone index client.
///
/// Talks to the index's data-plane host. When no host is configured it is
/// looked up once through the control plane (`GET /indexes/{name}`).
pub struct PineconeIndex {
    api_key: String,
    index_name: String,
    host: OnceCell<String>,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            ContextError::ConfigurationMissing("PINECONE_API_KEY not set".to_string())
        })?;

        let host = OnceCell::new();
        if let Some(h) = config.host.as_deref().filter(|h| !h.trim().is_empty()) {
            // A fresh cell cannot already be set.
            let _ = host.set(normalize_host(h));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key,
            index_name: config.index_name.clone(),
            host,
            http,
        })
    }

    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", PINECONE_CONTROL_PLANE, self.index_name);
                let resp = self
                    .http
                    .get(&url)
                    .header("Api-Key", &self.api_key)
                    .send()
                    .await?;
                let resp = check_status(resp, "describe index").await?;
                let described: DescribeIndexResponse = resp.json().await?;
                Ok::<String, ContextError>(normalize_host(&described.host))
            })
            .await?;
        Ok(host.as_str())
    }

    async fn post(&self, path: &str, body: serde_json::Value, what: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host().await?, path);
        let resp = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ContextError::Index(format!("{} request failed: {}", what, e)))?;
        check_status(resp, what).await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ContextError::Index(format!(
        "{} failed (HTTP {}): {}",
        what,
        status,
        body.chars().take(500).collect::<String>()
    )))
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: &str, entries: &[IndexEntry]) -> Result<usize> {
        let body = serde_json::json!({
            "vectors": entries,
            "namespace": namespace,
        });
        let resp = self.post("/vectors/upsert", body, "upsert").await?;
        let parsed: UpsertResponse = resp.json().await?;
        Ok(parsed.upserted_count.unwrap_or(entries.len()))
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": include_metadata,
            "namespace": namespace,
        });
        let resp = self.post("/query", body, "query").await?;
        let parsed: QueryResponse = resp.json().await?;
        Ok(parsed.matches)
    }
}

// ============ Unavailable ============

/// Stands in for an index whose construction failed; every call reports
/// `reason` as missing configuration.
pub struct UnavailableIndex {
    reason: String,
}

impl UnavailableIndex {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VectorIndex for UnavailableIndex {
    fn ensure_ready(&self) -> Result<()> {
        Err(ContextError::ConfigurationMissing(self.reason.clone()))
    }

    async fn upsert(&self, _namespace: &str, _entries: &[IndexEntry]) -> Result<usize> {
        Err(ContextError::ConfigurationMissing(self.reason.clone()))
    }

    async fn query(
        &self,
        _namespace: &str,
        _vector: &[f32],
        _top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>> {
        Err(ContextError::ConfigurationMissing(self.reason.clone()))
    }
}

/// Create the configured [`VectorIndex`].
pub fn create_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.provider.as_str() {
        "memory" => Ok(Arc::new(InMemoryIndex::new())),
        "pinecone" => Ok(Arc::new(PineconeIndex::new(config)?)),
        other => Err(ContextError::InvalidConfig(format!(
            "unknown index provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, values: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            values,
            metadata: serde_json::json!({"fileName": id}),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = InMemoryIndex::new();
        index.upsert("ns", &[entry("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert("ns", &[entry("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len("ns"), 1);
        let hits = index.query("ns", &[0.0, 1.0], 1, false).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[0].metadata.is_none());
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_and_truncates() {
        let index = InMemoryIndex::new();
        index
            .upsert(
                "ns",
                &[
                    entry("far", vec![-1.0, 0.0]),
                    entry("near", vec![1.0, 0.1]),
                    entry("mid", vec![0.5, 0.5]),
                ],
            )
            .await
            .unwrap();
        let hits = index.query("ns", &[1.0, 0.0], 2, true).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert_eq!(hits[0].metadata.as_ref().unwrap()["fileName"], "near");
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let index = InMemoryIndex::new();
        index.upsert("docs", &[entry("a", vec![1.0])]).await.unwrap();
        assert!(index.contains("docs", "a"));
        assert!(!index.contains("other", "a"));
        assert!(index.query("other", &[1.0], 5, true).await.unwrap().is_empty());
    }

    #[test]
    fn pinecone_without_key_is_configuration_missing() {
        let config = IndexConfig {
            provider: "pinecone".into(),
            api_key: Some(String::new()),
            ..IndexConfig::default()
        };
        assert!(matches!(
            PineconeIndex::new(&config),
            Err(ContextError::ConfigurationMissing(_))
        ));
    }

    type Recorded = Arc<std::sync::Mutex<Vec<(String, String, serde_json::Value)>>>;

    /// Local stand-in for a Pinecone data-plane host. Records the path,
    /// `Api-Key` header, and JSON body of every request.
    async fn pinecone_stub(upsert_reply: serde_json::Value) -> (String, Recorded) {
        use axum::{http::HeaderMap, routing::post, Json, Router};

        let seen: Recorded = Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = |path: &'static str, log: Recorded, reply: serde_json::Value| {
            move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let log = log.clone();
                let reply = reply.clone();
                async move {
                    let key = headers
                        .get("Api-Key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    log.lock().unwrap().push((path.to_string(), key, body));
                    Json(reply)
                }
            }
        };
        let matches = serde_json::json!({
            "matches": [
                {"id": "doc1_chunk_1", "score": 0.93, "metadata": {"fileName": "Bio"}},
                {"id": "doc2_chunk_0", "score": 0.71}
            ],
            "namespace": "drive-docs"
        });
        let app = Router::new()
            .route("/vectors/upsert", post(record("/vectors/upsert", seen.clone(), upsert_reply)))
            .route("/query", post(record("/query", seen.clone(), matches)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    fn pinecone_at(host: &str) -> PineconeIndex {
        PineconeIndex::new(&IndexConfig {
            provider: "pinecone".into(),
            host: Some(host.to_string()),
            api_key: Some("pc-test".into()),
            ..IndexConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn pinecone_upsert_sends_namespaced_vectors() {
        let (host, seen) = pinecone_stub(serde_json::json!({"upsertedCount": 2})).await;
        let index = pinecone_at(&host);

        let written = index
            .upsert(
                "drive-docs",
                &[entry("doc1_chunk_0", vec![0.5, 0.5]), entry("doc1_chunk_1", vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        assert_eq!(written, 2);

        let seen = seen.lock().unwrap();
        let (path, key, body) = &seen[0];
        assert_eq!(path, "/vectors/upsert");
        assert_eq!(key, "pc-test");
        assert_eq!(body["namespace"], "drive-docs");
        assert_eq!(body["vectors"][0]["id"], "doc1_chunk_0");
        assert_eq!(body["vectors"][1]["values"], serde_json::json!([1.0, 0.0]));
        assert_eq!(body["vectors"][0]["metadata"]["fileName"], "doc1_chunk_0");
    }

    #[tokio::test]
    async fn pinecone_upsert_without_count_assumes_all_written() {
        let (host, _seen) = pinecone_stub(serde_json::json!({})).await;
        let written = pinecone_at(&host)
            .upsert("drive-docs", &[entry("a", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn pinecone_query_sends_top_k_and_parses_matches() {
        let (host, seen) = pinecone_stub(serde_json::json!({})).await;
        let hits = pinecone_at(&host)
            .query("drive-docs", &[0.1, 0.2], 2, true)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "doc1_chunk_1");
        assert!(hits[1].metadata.is_none());

        let seen = seen.lock().unwrap();
        let (path, _, body) = &seen[0];
        assert_eq!(path, "/query");
        assert_eq!(body["topK"], 2);
        assert_eq!(body["includeMetadata"], true);
        assert_eq!(body["namespace"], "drive-docs");
        assert_eq!(body["vector"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pinecone_http_error_is_index_error() {
        let index = pinecone_at("http://127.0.0.1:9");
        let err = index.query("drive-docs", &[1.0], 1, false).await.unwrap_err();
        assert!(matches!(err, ContextError::Index(_)));
    }

    #[tokio::test]
    async fn unavailable_index_reports_configuration_missing() {
        let index = UnavailableIndex::new("PINECONE_API_KEY not set");
        assert!(index.ensure_ready().is_err());
        assert!(matches!(
            index.upsert("ns", &[]).await,
            Err(ContextError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn host_gets_scheme() {
        assert_eq!(
            normalize_host("portfolio-abc.svc.pinecone.io/"),
            "https://portfolio-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn query_response_parses_matches() {
        let raw = r#"{"matches":[{"id":"doc1_chunk_0","score":0.91,"metadata":{"fileName":"Bio"}}],"namespace":"drive-docs"}"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert_eq!(parsed.matches[0].id, "doc1_chunk_0");
    }
}
