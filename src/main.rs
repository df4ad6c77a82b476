// built-in
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

// external
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

// project
use revload::embedder::{EmbedderConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, VECTOR_DIM};
use revload::index::{
    CreateIndexRequest, IndexClient, IndexConfig, DEFAULT_CONTROLLER_URL, DEFAULT_INDEX, DEFAULT_NAMESPACE,
};
use revload::pipeline::{self, PipelineConfig, StatsOutcome};
use revload::retry::RetryConfig;
use revload::IngestError;

/// Exit status when the upsert succeeded but index stats could not be fetched.
const EXIT_STATS_FAILED: u8 = 3;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Embed every review and upsert it into the index (default)
    Load,
    /// Create the serverless index (administrative; not part of a normal load)
    CreateIndex {
        /// Distance metric
        #[arg(long, default_value = "cosine")]
        metric: String,

        /// Cloud provider for the serverless index
        #[arg(long, default_value = "aws")]
        cloud: String,

        /// Cloud region for the serverless index
        #[arg(long, default_value = "us-east-1")]
        region: String,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "revload")]
#[command(about = "Reviews JSON -> Gemini embeddings -> Pinecone namespace")]
pub struct Args {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Path of the reviews JSON file
    #[arg(long, env = "REVIEWS_PATH", default_value = "reviews.json")]
    pub input: PathBuf,

    /// Pinecone index name
    #[arg(long, env = "PINECONE_INDEX", default_value = DEFAULT_INDEX)]
    pub index: String,

    /// Namespace to upsert into
    #[arg(long, env = "PINECONE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Embedding model
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Embedding dimension; must match the index
    #[arg(long, env = "EMBEDDING_DIM", default_value_t = VECTOR_DIM)]
    pub dimension: usize,

    /// Index data-plane host; skips lookup by name when set
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub index_host: Option<String>,

    /// Pinecone control-plane URL
    #[arg(long, env = "PINECONE_CONTROLLER_URL", default_value = DEFAULT_CONTROLLER_URL)]
    pub pinecone_controller_url: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub gemini_base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for transient failures (timeouts, 408, 429, 5xx)
    #[arg(long, env = "MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    /// Embed and assemble only; no upsert
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

fn require(value: Option<String>, var: &str) -> Result<String, IngestError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| IngestError::Config(format!("{var} is not set")))
}

impl Args {
    fn timeout(&self) -> Result<Duration, IngestError> {
        if self.timeout_secs == 0 {
            return Err(IngestError::Config("REQUEST_TIMEOUT_SECS must be positive".into()));
        }
        Ok(Duration::from_secs(self.timeout_secs))
    }

    fn retry(&self) -> RetryConfig {
        RetryConfig::default().with_max_retries(self.max_retries)
    }

    pub fn index_config(&self) -> Result<IndexConfig, IngestError> {
        Ok(IndexConfig {
            api_key: require(self.pinecone_api_key.clone(), "PINECONE_API_KEY")?,
            controller_url: self.pinecone_controller_url.clone(),
            host: self.index_host.clone(),
            dimension: self.dimension,
            timeout: self.timeout()?,
            retry: self.retry(),
        })
    }

    pub fn resolve(self) -> Result<PipelineConfig, IngestError> {
        let gemini_key = require(self.gemini_api_key.clone(), "GEMINI_API_KEY")?;
        let index = self.index_config()?;
        if self.dimension == 0 {
            return Err(IngestError::Config("EMBEDDING_DIM must be positive".into()));
        }

        Ok(PipelineConfig {
            embedder: EmbedderConfig {
                api_key: gemini_key,
                model: self.model.clone(),
                base_url: self.gemini_base_url.clone(),
                dimension: self.dimension,
                timeout: self.timeout()?,
                retry: self.retry(),
            },
            index,
            input_path: self.input,
            index_name: self.index,
            namespace: self.namespace,
            dry_run: self.dry_run,
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    let cli_args = Args::parse();

    match cli_args.command.clone() {
        Some(Command::CreateIndex { metric, cloud, region }) => {
            let client = IndexClient::new(cli_args.index_config()?)?;
            let request =
                CreateIndexRequest::serverless(&cli_args.index, cli_args.dimension, metric, cloud, region);
            info!(index = %cli_args.index, "Starting create-index subcommand");
            let description = client.create_index(&request).await?;
            println!("{}", serde_json::to_string_pretty(&description)?);
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Load) | None => {
            let cfg = cli_args.resolve()?;
            info!("Starting revload");
            let report = pipeline::run(cfg).await?;
            match report.stats {
                StatsOutcome::Fetched(stats) => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                    Ok(ExitCode::SUCCESS)
                }
                StatsOutcome::Skipped => {
                    info!(records = report.records, "dry run finished");
                    Ok(ExitCode::SUCCESS)
                }
                StatsOutcome::Failed(e) => {
                    error!(upserted = report.upserted, "load applied but stats unavailable: {e}");
                    Ok(ExitCode::from(EXIT_STATS_FAILED))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_keys() -> Args {
        Args::try_parse_from([
            "revload",
            "--gemini-api-key",
            "g-key",
            "--pinecone-api-key",
            "p-key",
            "--input",
            "data/reviews.json",
        ])
        .unwrap()
    }

    #[test]
    fn resolve_builds_config_with_defaults() {
        let cfg = args_with_keys().resolve().unwrap();
        assert_eq!(cfg.index_name, "rag");
        assert_eq!(cfg.namespace, "ns1");
        assert_eq!(cfg.embedder.model, "text-embedding-004");
        assert_eq!(cfg.embedder.dimension, 768);
        assert_eq!(cfg.index.dimension, 768);
        assert_eq!(cfg.input_path, PathBuf::from("data/reviews.json"));
        assert!(!cfg.dry_run);
    }

    #[test]
    fn missing_gemini_key_is_config_error() {
        let mut args = args_with_keys();
        args.gemini_api_key = None;
        match args.resolve() {
            Err(IngestError::Config(msg)) => assert!(msg.contains("GEMINI_API_KEY")),
            other => panic!("expected config error, got {:?}", other.err()),
        }
    }

    #[test]
    fn blank_pinecone_key_is_config_error() {
        let mut args = args_with_keys();
        args.pinecone_api_key = Some("  ".into());
        match args.resolve() {
            Err(IngestError::Config(msg)) => assert!(msg.contains("PINECONE_API_KEY")),
            other => panic!("expected config error, got {:?}", other.err()),
        }
    }

    #[test]
    fn zero_timeout_is_config_error() {
        let mut args = args_with_keys();
        args.timeout_secs = 0;
        match args.resolve() {
            Err(IngestError::Config(msg)) => assert!(msg.contains("REQUEST_TIMEOUT_SECS")),
            other => panic!("expected config error, got {:?}", other.err()),
        }
    }

    #[test]
    fn create_index_subcommand_parses() {
        let args = Args::try_parse_from(["revload", "create-index", "--metric", "dotproduct"]).unwrap();
        match args.command {
            Some(Command::CreateIndex { metric, cloud, region }) => {
                assert_eq!(metric, "dotproduct");
                assert_eq!(cloud, "aws");
                assert_eq!(region, "us-east-1");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
