//! # Linnaea
//!
//! Client-side semantic search over commodity classification codes.
//!
//! Free-text product description in, ranked classification codes out,
//! without a backend: embedding collections are loaded from pre-generated
//! artifacts and scored locally.
//!
//! ## Features
//!
//! - Compact binary codec for embedding collections, with a textual
//!   JSON fallback format
//! - Binary-first loading with a single-slot cache and generation counter
//! - Exact cosine similarity ranking (linear scan)
//! - Keyword overlap fallback when no vector search is possible
//! - Pluggable embedding providers behind a registry

// Core modules
pub mod codec;
mod data;
mod engine;
mod error;
pub mod fetch;
pub mod lexical;
pub mod provider;
pub mod store;
pub mod vector;

// Re-exports for the public API
pub use data::{CodeRecord, Collection, EmbeddedRecord, Language, ResultSource, ScoredResult};
pub use engine::{DEFAULT_TOP_K, Engine, EngineBuilder, SearchRequest, SearchResponse};
pub use error::{LinnaeaError, Result};
pub use fetch::{Fetcher, FsFetcher, MemoryFetcher};
#[cfg(feature = "providers-http")]
pub use provider::{CohereEmbedder, HuggingFaceEmbedder, OpenAiEmbedder};
pub use provider::{Embedder, EmbedderRegistry, ProviderModel};
pub use store::{BasicDataset, CollectionHandle, CollectionStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
