// built-in
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

// external
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// project
use crate::embedder::VECTOR_DIM;
use crate::entity::UpsertEntry;
use crate::error::{IngestError, Result, Stage};
use crate::http;
use crate::retry::RetryConfig;

pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_INDEX: &str = "rag";
pub const DEFAULT_NAMESPACE: &str = "ns1";
const API_VERSION: &str = "2024-07";

#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub api_key: String,
    /// Control-plane base URL, used to resolve an index by name.
    pub controller_url: String,
    /// Data-plane host; when set, name resolution is skipped.
    pub host: Option<String>,
    /// Dimension assumed for the index when `host` is given directly.
    pub dimension: usize,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl IndexConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            controller_url: DEFAULT_CONTROLLER_URL.to_string(),
            host: None,
            dimension: VECTOR_DIM,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

/// Control-plane view of an index.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: IndexStatus,
}

/// Body for creating a serverless index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateIndexRequest {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub spec: IndexSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexSpec {
    pub serverless: ServerlessSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

impl CreateIndexRequest {
    pub fn serverless(
        name: impl Into<String>,
        dimension: usize,
        metric: impl Into<String>,
        cloud: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: metric.into(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: cloud.into(),
                    region: region.into(),
                },
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Summary returned by `describe_index_stats`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
    #[serde(default)]
    pub dimension: usize,
    #[serde(default)]
    pub index_fullness: f64,
    #[serde(default)]
    pub total_vector_count: u64,
}

impl IndexStats {
    pub fn namespace_count(&self, namespace: &str) -> u64 {
        self.namespaces.get(namespace).map_or(0, |n| n.vector_count)
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<&'a UpsertEntry>,
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

/// Control-plane client: index lookup, creation, and handle acquisition.
pub struct IndexClient {
    client: Client,
    api_key: String,
    controller_url: String,
    host: Option<String>,
    dimension: usize,
    retry: RetryConfig,
}

impl IndexClient {
    /// Validates the credential and builds the HTTP client; no network call.
    pub fn new(config: IndexConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(IngestError::Config("vector index API key is empty".into()));
        }
        if config.dimension == 0 {
            return Err(IngestError::Config("index dimension must be positive".into()));
        }
        Ok(Self {
            client: http::client(config.timeout)?,
            api_key: config.api_key,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
            host: config.host.filter(|h| !h.trim().is_empty()),
            dimension: config.dimension,
            retry: config.retry,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let url = format!("{}/indexes/{}", self.controller_url, name);
        http::send_json(&self.retry, || self.authed(self.client.get(&url)))
            .await
            .map_err(|e| IngestError::external(Stage::DescribeIndex, None, format!("index `{name}`: {e}")))
    }

    /// Create a serverless index. Administrative; a normal load never calls this.
    pub async fn create_index(&self, request: &CreateIndexRequest) -> Result<IndexDescription> {
        let url = format!("{}/indexes", self.controller_url);
        let description: IndexDescription =
            http::send_json(&self.retry, || self.authed(self.client.post(&url)).json(request))
                .await
                .map_err(|e| {
                    IngestError::external(Stage::CreateIndex, None, format!("index `{}`: {e}", request.name))
                })?;
        info!(
            index = %description.name,
            dim = description.dimension,
            metric = %description.metric,
            "created index"
        );
        Ok(description)
    }

    /// Acquire a writer for the index called `name`.
    ///
    /// With an explicit host the configured dimension is trusted; otherwise
    /// host and dimension come from the control plane, and the index must be
    /// ready.
    pub async fn index(&self, name: &str) -> Result<IndexWriter> {
        let (host, dimension) = match &self.host {
            Some(host) => (host.clone(), self.dimension),
            None => {
                let description = self.describe_index(name).await?;
                if !description.status.ready {
                    return Err(IngestError::external(
                        Stage::DescribeIndex,
                        None,
                        format!("index `{name}` is not ready (state: {})", description.status.state),
                    ));
                }
                if description.host.is_empty() {
                    return Err(IngestError::external(
                        Stage::DescribeIndex,
                        None,
                        format!("index `{name}` has no host"),
                    ));
                }
                (description.host, description.dimension)
            }
        };
        info!(index = name, host = %host, dim = dimension, "index handle acquired");
        Ok(IndexWriter {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: data_plane_url(&host),
            name: name.to_string(),
            dimension,
            retry: self.retry,
        })
    }
}

/// Data-plane handle for one index.
pub struct IndexWriter {
    client: Client,
    api_key: String,
    base_url: String,
    name: String,
    dimension: usize,
    retry: RetryConfig,
}

impl IndexWriter {
    pub fn dim(&self) -> usize {
        self.dimension
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Send every entry to `namespace` in one request.
    ///
    /// The whole batch is rejected, with nothing sent, if any vector's length
    /// differs from the index dimension. Entries sharing an id are collapsed
    /// to the last one. An empty batch succeeds without a request. Returns the
    /// number of vectors the store reports as upserted.
    pub async fn upsert(&self, entries: &[UpsertEntry], namespace: &str) -> Result<u64> {
        if let Some(bad) = entries.iter().find(|e| e.dim() != self.dimension) {
            return Err(IngestError::DimensionMismatch {
                id: bad.id.clone(),
                expected: self.dimension,
                actual: bad.dim(),
            });
        }

        let vectors = collapse_duplicates(entries);
        if vectors.is_empty() {
            info!(index = %self.name, namespace, "empty batch; nothing to upsert");
            return Ok(0);
        }

        let body = UpsertRequest { vectors, namespace };
        let response: UpsertResponse = http::send_json(&self.retry, || self.post("/vectors/upsert").json(&body))
            .await
            .map_err(|e| IngestError::external(Stage::Upsert, None, format!("namespace `{namespace}`: {e}")))?;

        info!(
            index = %self.name,
            namespace,
            sent = body.vectors.len(),
            upserted = response.upserted_count,
            "upserted batch"
        );
        Ok(response.upserted_count)
    }

    pub async fn describe_stats(&self) -> Result<IndexStats> {
        http::send_json(&self.retry, || {
            self.post("/describe_index_stats").json(&serde_json::json!({}))
        })
        .await
        .map_err(|e| IngestError::external(Stage::Stats, None, e))
    }
}

/// Keep one entry per id: the last in input order, at the first one's slot.
fn collapse_duplicates(entries: &[UpsertEntry]) -> Vec<&UpsertEntry> {
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    let mut out: Vec<&UpsertEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match slots.get(entry.id.as_str()) {
            Some(&slot) => {
                warn!(id = %entry.id, "duplicate id in batch; later record wins");
                out[slot] = entry;
            }
            None => {
                slots.insert(entry.id.as_str(), out.len());
                out.push(entry);
            }
        }
    }
    out
}

fn data_plane_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ReviewMetadata;

    fn entry(id: &str, review: &str) -> UpsertEntry {
        UpsertEntry {
            id: id.into(),
            values: vec![0.0; 3],
            metadata: ReviewMetadata {
                review: review.into(),
                subject: "Math".into(),
                stars: 3.into(),
            },
        }
    }

    #[test]
    fn duplicates_keep_last_value_in_first_slot() {
        let entries = vec![entry("a", "first"), entry("b", "only"), entry("a", "second")];
        let out = collapse_duplicates(&entries);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a");
        assert_eq!(out[0].metadata.review, "second");
        assert_eq!(out[1].id, "b");
    }

    #[test]
    fn host_without_scheme_gets_https() {
        assert_eq!(data_plane_url("rag-abc.svc.pinecone.io"), "https://rag-abc.svc.pinecone.io");
        assert_eq!(data_plane_url("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[test]
    fn stats_parse_camel_case() {
        let stats: IndexStats = serde_json::from_value(serde_json::json!({
            "namespaces": {"ns1": {"vectorCount": 12}},
            "dimension": 768,
            "indexFullness": 0.0,
            "totalVectorCount": 12
        }))
        .unwrap();
        assert_eq!(stats.namespace_count("ns1"), 12);
        assert_eq!(stats.namespace_count("other"), 0);
        assert_eq!(stats.total_vector_count, 12);
    }

    #[test]
    fn create_request_wire_shape() {
        let req = CreateIndexRequest::serverless("rag", 768, "cosine", "aws", "us-east-1");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({
                "name": "rag",
                "dimension": 768,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
            })
        );
    }

    #[test]
    fn blank_key_is_config_error() {
        assert!(matches!(
            IndexClient::new(IndexConfig::new("")),
            Err(IngestError::Config(_))
        ));
    }
}
