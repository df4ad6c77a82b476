pub mod entry;
pub mod review;

pub use entry::{Embedding, ReviewMetadata, UpsertEntry};
pub use review::{Review, ReviewRecord};
