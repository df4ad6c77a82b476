use anyhow::{Context, Result};
use revload::index::{IndexClient, IndexConfig, DEFAULT_INDEX};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let api_key = std::env::var("PINECONE_API_KEY").context("PINECONE_API_KEY is not set")?;
    let index_name = std::env::var("PINECONE_INDEX").unwrap_or_else(|_| DEFAULT_INDEX.to_string());
    println!("Using PINECONE_INDEX={}", index_name);

    let client = IndexClient::new(IndexConfig::new(api_key))?;
    let writer = client.index(&index_name).await?;
    let stats = writer.describe_stats().await?;

    println!("total vectors: {} (dim {})", stats.total_vector_count, stats.dimension);
    for (ns, s) in &stats.namespaces {
        println!("namespace {}: {}", ns, s.vector_count);
    }
    Ok(())
}
