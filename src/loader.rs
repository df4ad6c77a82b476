// built-in
use std::path::Path;

// external
use serde::Deserialize;
use tracing::info;

// project
use crate::entity::ReviewRecord;
use crate::error::{IngestError, Result};

/// Top-level shape of the input document: `{ "reviews": [ ... ] }`.
#[derive(Deserialize)]
struct ReviewFile {
    reviews: Vec<ReviewRecord>,
}

/// Read and parse the review collection at `path`.
///
/// Any read failure, invalid JSON, a missing `reviews` key, or a field of the
/// wrong JSON type is a [`IngestError::Format`]. Absent record fields are left
/// for validation.
pub async fn load_reviews(path: &Path) -> Result<Vec<ReviewRecord>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::format(path.display(), e))?;
    let records = parse_reviews(&bytes).map_err(|e| IngestError::format(path.display(), e))?;
    info!(path = %path.display(), records = records.len(), "loaded review file");
    Ok(records)
}

fn parse_reviews(bytes: &[u8]) -> serde_json::Result<Vec<ReviewRecord>> {
    let file: ReviewFile = serde_json::from_slice(bytes)?;
    Ok(file.reviews)
}
