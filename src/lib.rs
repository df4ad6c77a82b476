pub mod assembler;
pub mod embedder;
pub mod entity;
pub mod error;
mod http;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod retry;

pub use error::{IngestError, Result, Stage};
