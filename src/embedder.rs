// built-in
use std::time::Duration;

// external
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// project
use crate::entity::Embedding;
use crate::error::{IngestError, Result, Stage};
use crate::http;
use crate::retry::RetryConfig;

/// Output size of `text-embedding-004`.
pub const VECTOR_DIM: usize = 768;
pub const DEFAULT_MODEL: &str = "text-embedding-004";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone, Debug)]
pub struct EmbedderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Expected vector length; reported by [`Embedder::dim`].
    pub dimension: usize,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl EmbedderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            dimension: VECTOR_DIM,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// Client for the Gemini `embedContent` endpoint.
pub struct Embedder {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimension: usize,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Option<Vec<f32>>,
}

impl Embedder {
    /// Build the embedder. Fails with a config error on a blank key; makes no
    /// network call.
    pub fn new(config: EmbedderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(IngestError::Config("embedding API key is empty".into()));
        }
        let model = config.model.trim_start_matches("models/").to_string();
        if model.is_empty() {
            return Err(IngestError::Config("embedding model name is empty".into()));
        }
        let endpoint = format!(
            "{}/v1beta/models/{}:embedContent",
            config.base_url.trim_end_matches('/'),
            model
        );
        info!(model = %model, dim = config.dimension, "embedder configured");
        Ok(Self {
            client: http::client(config.timeout)?,
            api_key: config.api_key,
            endpoint,
            model,
            dimension: config.dimension,
            retry: config.retry,
        })
    }

    /// Embed one text. `record` names the source record in error messages.
    pub async fn embed(&self, text: &str, record: Option<&str>) -> Result<Embedding> {
        let body = EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content { parts: [Part { text }] },
        };
        let response: EmbedResponse = http::send_json(&self.retry, || {
            self.client
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await
        .map_err(|e| IngestError::external(Stage::Embed, record, e))?;

        let values = response
            .embedding
            .and_then(|e| e.values)
            .ok_or_else(|| IngestError::external(Stage::Embed, record, "response missing embedding.values"))?;
        debug!(record = ?record, dim = values.len(), "embedded text");
        Ok(values)
    }

    /// Embed texts one call at a time, in order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text, None).await?);
        }
        Ok(out)
    }

    pub fn dim(&self) -> usize {
        self.dimension
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_config_error() {
        let err = Embedder::new(EmbedderConfig::new("   ")).err().unwrap();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn model_prefix_is_normalized() {
        let mut cfg = EmbedderConfig::new("k");
        cfg.model = "models/text-embedding-004".into();
        cfg.base_url = "http://localhost:1234/".into();
        let e = Embedder::new(cfg).unwrap();
        assert_eq!(e.model(), "text-embedding-004");
        assert_eq!(
            e.endpoint,
            "http://localhost:1234/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let body = EmbedRequest {
            model: "models/text-embedding-004".into(),
            content: Content { parts: [Part { text: "hello" }] },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "hello"}]}
            })
        );
    }
}
