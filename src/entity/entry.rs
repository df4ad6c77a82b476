// external
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Dense embedding produced for one review.
pub type Embedding = Vec<f32>;

/// Unit of storage in the vector index; serializes to the upsert wire shape.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct UpsertEntry {
    pub id: String,
    pub values: Embedding,
    pub metadata: ReviewMetadata,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ReviewMetadata {
    pub review: String,
    pub subject: String,
    pub stars: Number,
}

impl UpsertEntry {
    pub fn dim(&self) -> usize {
        self.values.len()
    }
}
