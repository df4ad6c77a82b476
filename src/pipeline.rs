// built-in
use std::path::PathBuf;

// external
use tokio::time::Instant;
use tracing::{info, warn};

// project
use crate::assembler::assemble;
use crate::embedder::{Embedder, EmbedderConfig};
use crate::entity::UpsertEntry;
use crate::error::{IngestError, Result};
use crate::index::{IndexClient, IndexConfig, IndexStats};
use crate::loader::load_reviews;

pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub index_name: String,
    pub namespace: String,
    pub embedder: EmbedderConfig,
    pub index: IndexConfig,
    /// Embed and assemble, but skip the upsert and stats calls.
    pub dry_run: bool,
}

/// What happened to the post-upsert stats request.
#[derive(Debug)]
pub enum StatsOutcome {
    /// Dry run: no index calls were made.
    Skipped,
    Fetched(IndexStats),
    /// The load itself succeeded; only the stats call failed.
    Failed(IngestError),
}

#[derive(Debug)]
pub struct RunReport {
    pub records: usize,
    pub upserted: u64,
    pub stats: StatsOutcome,
}

/// Load, embed, assemble, upsert, then fetch index stats.
///
/// Any error before or during the upsert aborts the run. A stats failure is
/// returned inside the report instead.
pub async fn run(cfg: PipelineConfig) -> Result<RunReport> {
    let start_time = Instant::now();
    info!(
        input = %cfg.input_path.display(),
        index = %cfg.index_name,
        namespace = %cfg.namespace,
        dry_run = cfg.dry_run,
        "revload starting with config"
    );

    // Clients first: credential problems surface before any I/O.
    let embedder = Embedder::new(cfg.embedder)?;
    let index_client = IndexClient::new(cfg.index)?;
    info!(model = embedder.model(), dim = embedder.dim(), "embedder ready");

    let records = load_reviews(&cfg.input_path).await?;
    let reviews = records
        .iter()
        .enumerate()
        .map(|(position, record)| record.validate(position))
        .collect::<Result<Vec<_>>>()?;

    let writer = if cfg.dry_run {
        None
    } else {
        let writer = index_client.index(&cfg.index_name).await?;
        if writer.dim() != embedder.dim() {
            return Err(IngestError::Config(format!(
                "index `{}` has dimension {} but the embedding dimension is configured as {}",
                writer.name(),
                writer.dim(),
                embedder.dim()
            )));
        }
        Some(writer)
    };

    let t_embed_start = Instant::now();
    let mut entries: Vec<UpsertEntry> = Vec::with_capacity(reviews.len());
    for review in reviews {
        let values = embedder.embed(review.text, Some(review.professor)).await?;
        entries.push(assemble(review, values));
    }
    let embed_ms = t_embed_start.elapsed().as_millis();
    info!(count = entries.len(), embed_ms = embed_ms as u64, "embedded all records");

    let Some(writer) = writer else {
        info!(count = entries.len(), "dry run; skipping upsert");
        return Ok(RunReport {
            records: records.len(),
            upserted: 0,
            stats: StatsOutcome::Skipped,
        });
    };

    let t_upsert_start = Instant::now();
    let upserted = writer.upsert(&entries, &cfg.namespace).await?;
    let upsert_ms = t_upsert_start.elapsed().as_millis();

    let stats = match writer.describe_stats().await {
        Ok(stats) => {
            info!(
                namespace = %cfg.namespace,
                namespace_vectors = stats.namespace_count(&cfg.namespace),
                total_vectors = stats.total_vector_count,
                "index stats"
            );
            StatsOutcome::Fetched(stats)
        }
        Err(e) => {
            warn!(error = %e, "stats request failed; upsert already applied");
            StatsOutcome::Failed(e)
        }
    };

    let total_ms = start_time.elapsed().as_millis();
    info!(
        records = records.len(),
        upserted,
        embed_ms = embed_ms as u64,
        upsert_ms = upsert_ms as u64,
        total_ms = total_ms as u64,
        "load complete"
    );

    Ok(RunReport {
        records: records.len(),
        upserted,
        stats,
    })
}
