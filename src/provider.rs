//! Embedding providers.
//!
//! The engine consumes embeddings through the [`Embedder`] trait and
//! resolves embedders through an [`EmbedderRegistry`] injected at build
//! time; nothing in the crate holds global provider state. [`ProviderModel`]
//! enumerates the supported provider/model presets with their output
//! dimensions.
//!
//! HTTP client implementations for the three hosted services live behind
//! the `providers-http` feature. API keys are bound at construction, not
//! passed per call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{LinnaeaError, Result};

/// Supported provider/model presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderModel {
    /// OpenAI `text-embedding-3-small`, 1536 dimensions.
    OpenAiSmall,
    /// OpenAI `text-embedding-3-large`, 3072 dimensions.
    OpenAiLarge,
    /// Cohere `embed-english-v3.0`, 1024 dimensions.
    Cohere,
    /// Hugging Face `sentence-transformers/all-MiniLM-L6-v2`, 384 dimensions.
    HuggingFace,
}

impl ProviderModel {
    /// All presets, in display order.
    pub fn all() -> [ProviderModel; 4] {
        [
            ProviderModel::OpenAiSmall,
            ProviderModel::OpenAiLarge,
            ProviderModel::Cohere,
            ProviderModel::HuggingFace,
        ]
    }

    /// Provider identifier used in resource paths and registry keys.
    pub fn provider_id(&self) -> &'static str {
        match self {
            ProviderModel::OpenAiSmall | ProviderModel::OpenAiLarge => "openai",
            ProviderModel::Cohere => "cohere",
            ProviderModel::HuggingFace => "huggingface",
        }
    }

    /// Model identifier within the provider.
    pub fn model_id(&self) -> &'static str {
        match self {
            ProviderModel::OpenAiSmall => "text-embedding-3-small",
            ProviderModel::OpenAiLarge => "text-embedding-3-large",
            ProviderModel::Cohere => "embed-english-v3.0",
            ProviderModel::HuggingFace => "sentence-transformers/all-MiniLM-L6-v2",
        }
    }

    /// Output dimension of the model.
    pub fn dimension(&self) -> usize {
        match self {
            ProviderModel::OpenAiSmall => 1536,
            ProviderModel::OpenAiLarge => 3072,
            ProviderModel::Cohere => 1024,
            ProviderModel::HuggingFace => 384,
        }
    }
}

/// Turns query text into a fixed-length embedding vector.
///
/// Failures (auth, network, rate limits) surface as
/// [`LinnaeaError::Provider`] so the caller can fall back to keyword
/// ranking.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn provider_id(&self) -> &str;

    /// Model identifier within the provider.
    fn model_id(&self) -> &str;

    /// Output dimension of this embedder.
    fn dimension(&self) -> usize;

    /// Embed a single query text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Registry of embedders keyed by (provider id, model id).
///
/// Injected into the engine at build time; an unknown pair resolves to a
/// provider error, which degrades to the keyword fallback.
#[derive(Default)]
pub struct EmbedderRegistry {
    embedders: HashMap<(String, String), Arc<dyn Embedder>>,
}

impl EmbedderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an embedder under its own provider/model ids, replacing any
    /// previous registration for the pair.
    pub fn register(&mut self, embedder: Arc<dyn Embedder>) {
        let key = (
            embedder.provider_id().to_string(),
            embedder.model_id().to_string(),
        );
        self.embedders.insert(key, embedder);
    }

    /// Resolve the embedder for a provider/model pair.
    pub fn resolve(&self, provider_id: &str, model_id: &str) -> Result<Arc<dyn Embedder>> {
        self.embedders
            .get(&(provider_id.to_string(), model_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                LinnaeaError::provider(format!(
                    "no embedder registered for provider '{provider_id}' model '{model_id}'"
                ))
            })
    }

    pub fn len(&self) -> usize {
        self.embedders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedders.is_empty()
    }
}

#[cfg(feature = "providers-http")]
pub use http::{CohereEmbedder, HuggingFaceEmbedder, OpenAiEmbedder};

#[cfg(feature = "providers-http")]
mod http {
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    use super::ProviderModel;
    use crate::error::{LinnaeaError, Result};

    const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
    const COHERE_EMBED_URL: &str = "https://api.cohere.ai/v1/embed";
    const HUGGINGFACE_FEATURE_EXTRACTION_URL: &str =
        "https://api-inference.huggingface.co/pipeline/feature-extraction";

    /// OpenAI embeddings client.
    pub struct OpenAiEmbedder {
        client: reqwest::Client,
        api_key: String,
        model: ProviderModel,
    }

    impl OpenAiEmbedder {
        /// Create a client for one of the OpenAI models.
        pub fn new(api_key: impl Into<String>, model: ProviderModel) -> Result<Self> {
            if model.provider_id() != "openai" {
                return Err(LinnaeaError::invalid_argument(format!(
                    "'{}' is not an OpenAI model",
                    model.model_id()
                )));
            }
            Ok(Self {
                client: reqwest::Client::new(),
                api_key: api_key.into(),
                model,
            })
        }
    }

    #[derive(Serialize)]
    struct OpenAiRequest<'a> {
        input: &'a str,
        model: &'a str,
    }

    #[derive(Deserialize)]
    struct OpenAiResponse {
        data: Vec<OpenAiEmbeddingRow>,
    }

    #[derive(Deserialize)]
    struct OpenAiEmbeddingRow {
        embedding: Vec<f32>,
    }

    #[async_trait]
    impl super::Embedder for OpenAiEmbedder {
        fn provider_id(&self) -> &str {
            self.model.provider_id()
        }

        fn model_id(&self) -> &str {
            self.model.model_id()
        }

        fn dimension(&self) -> usize {
            self.model.dimension()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let body = OpenAiRequest {
                input: text,
                model: self.model.model_id(),
            };
            let response = self
                .client
                .post(OPENAI_EMBEDDINGS_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| LinnaeaError::provider(format!("openai request failed: {e}")))?;
            if !response.status().is_success() {
                return Err(LinnaeaError::provider(format!(
                    "openai returned status {}",
                    response.status()
                )));
            }
            let parsed: OpenAiResponse = response
                .json()
                .await
                .map_err(|e| LinnaeaError::provider(format!("openai response malformed: {e}")))?;
            parsed
                .data
                .into_iter()
                .next()
                .map(|row| row.embedding)
                .ok_or_else(|| LinnaeaError::provider("openai response contained no embeddings"))
        }
    }

    /// Cohere embeddings client.
    pub struct CohereEmbedder {
        client: reqwest::Client,
        api_key: String,
    }

    impl CohereEmbedder {
        pub fn new(api_key: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                api_key: api_key.into(),
            }
        }
    }

    #[derive(Serialize)]
    struct CohereRequest<'a> {
        texts: [&'a str; 1],
        model: &'a str,
        input_type: &'a str,
    }

    #[derive(Deserialize)]
    struct CohereResponse {
        embeddings: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl super::Embedder for CohereEmbedder {
        fn provider_id(&self) -> &str {
            ProviderModel::Cohere.provider_id()
        }

        fn model_id(&self) -> &str {
            ProviderModel::Cohere.model_id()
        }

        fn dimension(&self) -> usize {
            ProviderModel::Cohere.dimension()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // Datasets are embedded with input_type "search_document";
            // queries use the matching "search_query".
            let body = CohereRequest {
                texts: [text],
                model: ProviderModel::Cohere.model_id(),
                input_type: "search_query",
            };
            let response = self
                .client
                .post(COHERE_EMBED_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| LinnaeaError::provider(format!("cohere request failed: {e}")))?;
            if !response.status().is_success() {
                return Err(LinnaeaError::provider(format!(
                    "cohere returned status {}",
                    response.status()
                )));
            }
            let parsed: CohereResponse = response
                .json()
                .await
                .map_err(|e| LinnaeaError::provider(format!("cohere response malformed: {e}")))?;
            parsed
                .embeddings
                .into_iter()
                .next()
                .ok_or_else(|| LinnaeaError::provider("cohere response contained no embeddings"))
        }
    }

    /// Hugging Face inference API client.
    pub struct HuggingFaceEmbedder {
        client: reqwest::Client,
        api_token: String,
    }

    impl HuggingFaceEmbedder {
        pub fn new(api_token: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                api_token: api_token.into(),
            }
        }
    }

    #[derive(Serialize)]
    struct HuggingFaceRequest<'a> {
        inputs: &'a str,
    }

    /// The inference API returns a bare vector for a single input, or a
    /// batch of vectors depending on the deployment.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HuggingFaceResponse {
        Single(Vec<f32>),
        Batch(Vec<Vec<f32>>),
    }

    #[async_trait]
    impl super::Embedder for HuggingFaceEmbedder {
        fn provider_id(&self) -> &str {
            ProviderModel::HuggingFace.provider_id()
        }

        fn model_id(&self) -> &str {
            ProviderModel::HuggingFace.model_id()
        }

        fn dimension(&self) -> usize {
            ProviderModel::HuggingFace.dimension()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let url = format!(
                "{}/{}",
                HUGGINGFACE_FEATURE_EXTRACTION_URL,
                ProviderModel::HuggingFace.model_id()
            );
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_token)
                .json(&HuggingFaceRequest { inputs: text })
                .send()
                .await
                .map_err(|e| {
                    LinnaeaError::provider(format!("huggingface request failed: {e}"))
                })?;
            if !response.status().is_success() {
                return Err(LinnaeaError::provider(format!(
                    "huggingface returned status {}",
                    response.status()
                )));
            }
            let parsed: HuggingFaceResponse = response.json().await.map_err(|e| {
                LinnaeaError::provider(format!("huggingface response malformed: {e}"))
            })?;
            match parsed {
                HuggingFaceResponse::Single(vector) => Ok(vector),
                HuggingFaceResponse::Batch(mut batch) => {
                    if batch.is_empty() {
                        Err(LinnaeaError::provider(
                            "huggingface response contained no embeddings",
                        ))
                    } else {
                        Ok(batch.swap_remove(0))
                    }
                }
            }
        }
    }
}
