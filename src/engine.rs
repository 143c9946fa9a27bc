//! Search facade.
//!
//! [`Engine`] ties the embedder registry, the collection store, and the two
//! rankers together behind one `search` call:
//!
//! 1. Resolve the embedder for the requested provider/model pair.
//! 2. Embed the query text.
//! 3. Load (or reuse) the embedding collection.
//! 4. Rank by cosine similarity.
//!
//! Any recoverable failure along that chain degrades to keyword ranking
//! over the basic dataset; the response says which path produced the
//! results. A dimension mismatch is fatal and propagates. When the
//! fallback dataset is unavailable too, the error reports both failures.

use std::sync::Arc;

use log::{debug, warn};

use crate::data::{Language, ResultSource, ScoredResult};
use crate::error::{LinnaeaError, Result};
use crate::fetch::Fetcher;
use crate::lexical;
use crate::provider::{Embedder, EmbedderRegistry, ProviderModel};
use crate::store::{BasicDataset, CollectionStore, DEFAULT_BASE_PATH};
use crate::vector;

/// Results returned when the request does not specify a size.
pub const DEFAULT_TOP_K: usize = 10;

/// A single search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Provider id of the embedding collection (e.g. "openai").
    pub provider_id: String,
    /// Model id within the provider.
    pub model_id: String,
    /// Free-text query.
    pub query: String,
    /// Maximum number of results to return.
    pub top_k: usize,
    /// Language used by the keyword fallback.
    pub language: Language,
}

impl SearchRequest {
    pub fn new(
        provider_id: impl Into<String>,
        model_id: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            language: Language::Primary,
        }
    }

    /// Build a request against one of the provider presets.
    pub fn for_model(model: ProviderModel, query: impl Into<String>) -> Self {
        Self::new(model.provider_id(), model.model_id(), query)
    }

    /// Set the maximum number of results.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the keyword fallback language.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

/// Results of a search plus how they were produced.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<ScoredResult>,
    /// Which ranking path produced the results.
    pub source: ResultSource,
    /// Cache generation of the collection used; `None` on the keyword path.
    pub generation: Option<u64>,
}

/// Search facade over providers, the collection store, and the rankers.
pub struct Engine {
    registry: EmbedderRegistry,
    store: CollectionStore,
    basic: BasicDataset,
}

impl Engine {
    /// Create an [`EngineBuilder`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = Engine::builder(Arc::new(FsFetcher::new(".")))
    ///     .embedder(Arc::new(my_embedder))
    ///     .build();
    /// ```
    pub fn builder(fetcher: Arc<dyn Fetcher>) -> EngineBuilder {
        EngineBuilder::new(fetcher)
    }

    /// The collection store, for cache generation checks.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Execute a search request.
    ///
    /// An empty result list is a valid outcome, not an error.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        match self.vector_search(&request).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_recoverable() => {
                warn!("vector search failed ({e}), falling back to keyword ranking");
                self.keyword_search(&request, &e).await
            }
            Err(e) => Err(e),
        }
    }

    async fn vector_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let embedder = self
            .registry
            .resolve(&request.provider_id, &request.model_id)?;
        let query_vector = embedder.embed(&request.query).await?;
        let handle = self
            .store
            .load(&request.provider_id, &request.model_id)
            .await?;

        let results = vector::rank(&query_vector, &handle.collection, request.top_k)?;
        debug!(
            "vector search for '{}' returned {} results (generation {})",
            request.query,
            results.len(),
            handle.generation
        );

        Ok(SearchResponse {
            results,
            source: ResultSource::Vector,
            generation: Some(handle.generation),
        })
    }

    async fn keyword_search(
        &self,
        request: &SearchRequest,
        vector_err: &LinnaeaError,
    ) -> Result<SearchResponse> {
        let records = match self.basic.load().await {
            Ok(records) => records,
            Err(keyword_err) => {
                return Err(LinnaeaError::SearchUnavailable {
                    vector: vector_err.to_string(),
                    keyword: keyword_err.to_string(),
                });
            }
        };

        let results = lexical::rank(&request.query, &records, request.top_k, request.language);
        debug!(
            "keyword fallback for '{}' returned {} results",
            request.query,
            results.len()
        );

        Ok(SearchResponse {
            results,
            source: ResultSource::Keyword,
            generation: None,
        })
    }
}

/// Builder for constructing an [`Engine`].
pub struct EngineBuilder {
    fetcher: Arc<dyn Fetcher>,
    registry: EmbedderRegistry,
    base_path: String,
}

impl EngineBuilder {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            registry: EmbedderRegistry::new(),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }

    /// Register an embedder under its own provider/model ids.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.registry.register(embedder);
        self
    }

    /// Replace the whole embedder registry.
    pub fn registry(mut self, registry: EmbedderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Resource directory relative to the fetcher root (default `data`).
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Build the [`Engine`].
    ///
    /// An engine without embedders is valid: every search degrades to the
    /// keyword fallback.
    pub fn build(self) -> Engine {
        Engine {
            registry: self.registry,
            store: CollectionStore::with_base_path(self.fetcher.clone(), self.base_path.clone()),
            basic: BasicDataset::with_base_path(self.fetcher, self.base_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    #[test]
    fn test_request_defaults() {
        let request = SearchRequest::new("openai", "text-embedding-3-small", "wool gloves");
        assert_eq!(request.top_k, DEFAULT_TOP_K);
        assert_eq!(request.language, Language::Primary);
    }

    #[test]
    fn test_request_for_model_preset() {
        let request = SearchRequest::for_model(ProviderModel::HuggingFace, "wool gloves")
            .top_k(3)
            .language(Language::Alt);
        assert_eq!(request.provider_id, "huggingface");
        assert_eq!(request.model_id, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(request.top_k, 3);
        assert_eq!(request.language, Language::Alt);
    }

    #[tokio::test]
    async fn test_engine_without_embedders_builds() {
        let engine = Engine::builder(Arc::new(MemoryFetcher::new())).build();
        assert_eq!(engine.store().generation(), 0);
    }
}
