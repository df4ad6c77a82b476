use anyhow::{Context, Result};
use revload::embedder::{Embedder, EmbedderConfig, VECTOR_DIM};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt::try_init();

    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
    let embedder = Embedder::new(EmbedderConfig::new(api_key))?;

    let texts = vec!["hello world", "another one"];
    let vecs = embedder.embed_batch(&texts).await?;

    println!(
        "embedded {} texts; first vector dim = {} (expected {})",
        vecs.len(),
        vecs.first().map(|v| v.len()).unwrap_or(0),
        VECTOR_DIM
    );
    Ok(())
}
