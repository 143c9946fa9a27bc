//! Embedding collection loading and caching.
//!
//! ## Resource layout
//!
//! ```text
//! {base}/{provider}-embeddings/{model_key}.bin    binary artifact (preferred)
//! {base}/{provider}-embeddings/{model_key}.json   textual artifact (fallback)
//! {base}/hs-codes-basic.json                      vector-less fallback dataset
//! ```
//!
//! The provider segment is the lowercased provider id; `model_key` is the
//! model id with `.` and `/` replaced by `-` (Hugging Face model ids contain
//! slashes). The textual artifact is tried only when the *fetch* of the
//! binary one fails; a binary artifact that fetches but fails to decode is
//! reported as such.
//!
//! ## Caching
//!
//! [`CollectionStore`] keeps the most recently loaded collection in a single
//! slot behind an `Arc`. Loads return a [`CollectionHandle`] carrying the
//! collection and the monotonically increasing generation that produced it,
//! so in-flight scoring keeps a consistent snapshot even if a concurrent
//! load replaces the slot, and callers can compare a handle's generation
//! against [`CollectionStore::generation`] to detect staleness.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::codec;
use crate::data::{CodeRecord, Collection, EmbeddedRecord};
use crate::error::{LinnaeaError, Result};
use crate::fetch::Fetcher;

/// Default resource directory, relative to the fetcher root.
pub const DEFAULT_BASE_PATH: &str = "data";

/// File name of the vector-less fallback dataset.
pub const BASIC_DATASET_FILE: &str = "hs-codes-basic.json";

/// Canonical resource key for a model id.
pub fn model_key(model_id: &str) -> String {
    model_id.replace(['.', '/'], "-")
}

/// A loaded collection plus the cache generation that produced it.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    pub collection: Arc<Collection>,
    pub generation: u64,
}

struct CacheSlot {
    provider_key: String,
    model_key: String,
    collection: Arc<Collection>,
    generation: u64,
}

/// Loads embedding collections, preferring the binary artifact and falling
/// back to the textual one, with a single-slot cache.
pub struct CollectionStore {
    fetcher: Arc<dyn Fetcher>,
    base_path: String,
    slot: RwLock<Option<CacheSlot>>,
    generation: AtomicU64,
}

impl CollectionStore {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_base_path(fetcher, DEFAULT_BASE_PATH)
    }

    pub fn with_base_path(fetcher: Arc<dyn Fetcher>, base_path: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_path: base_path.into(),
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Generation of the most recent cache replacement. Zero before the
    /// first load.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Load the collection for a provider/model pair.
    ///
    /// Returns the cached collection when the pair matches the cache slot;
    /// otherwise fetches, replaces the slot, and bumps the generation.
    pub async fn load(&self, provider_id: &str, model_id: &str) -> Result<CollectionHandle> {
        let provider_key = provider_id.to_lowercase();
        let model = model_key(model_id);

        {
            let slot = self.slot.read();
            if let Some(slot) = slot.as_ref()
                && slot.provider_key == provider_key
                && slot.model_key == model
            {
                debug!("collection cache hit for {provider_key}/{model}");
                return Ok(CollectionHandle {
                    collection: slot.collection.clone(),
                    generation: slot.generation,
                });
            }
        }

        let collection = Arc::new(self.fetch_collection(&provider_key, &model).await?);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "loaded collection {}/{} ({} records, dimension {}) as generation {}",
            provider_key,
            model,
            collection.len(),
            collection.dimension,
            generation
        );

        let handle = CollectionHandle {
            collection: collection.clone(),
            generation,
        };
        *self.slot.write() = Some(CacheSlot {
            provider_key,
            model_key: model,
            collection,
            generation,
        });
        Ok(handle)
    }

    async fn fetch_collection(&self, provider_key: &str, model: &str) -> Result<Collection> {
        let binary_path = format!("{}/{}-embeddings/{}.bin", self.base_path, provider_key, model);
        let textual_path = format!("{}/{}-embeddings/{}.json", self.base_path, provider_key, model);

        let binary_err = match self.fetcher.fetch(&binary_path).await {
            // Decode failures propagate: the artifact was there but is bad.
            Ok(data) => return codec::decode(&data),
            Err(e) => e,
        };
        debug!("binary artifact '{binary_path}' unavailable ({binary_err}), trying textual");

        let textual_err = match self.fetcher.fetch(&textual_path).await {
            Ok(data) => return parse_textual(&data),
            Err(e) => e,
        };
        warn!("embedding store unavailable for {provider_key}/{model}");

        Err(LinnaeaError::StoreUnavailable {
            binary: format!("'{binary_path}' ({binary_err})"),
            textual: format!("'{textual_path}' ({textual_err})"),
        })
    }
}

/// Textual artifact shape written by the dataset generators.
#[derive(Debug, Deserialize)]
struct TextualArtifact {
    hs_codes: Vec<EmbeddedRecord>,
    metadata: TextualMetadata,
}

#[derive(Debug, Deserialize)]
struct TextualMetadata {
    provider: String,
    model: String,
    #[serde(default)]
    total_codes: Option<u64>,
    embedding_dim: usize,
}

fn parse_textual(data: &[u8]) -> Result<Collection> {
    let artifact: TextualArtifact = serde_json::from_slice(data)?;
    let dimension = artifact.metadata.embedding_dim;

    if let Some(total) = artifact.metadata.total_codes
        && total as usize != artifact.hs_codes.len()
    {
        debug!(
            "textual artifact declares {} codes but contains {}",
            total,
            artifact.hs_codes.len()
        );
    }
    for (index, embedded) in artifact.hs_codes.iter().enumerate() {
        if embedded.vector.len() != dimension {
            return Err(LinnaeaError::format_error(format!(
                "textual record {} ('{}') has vector length {}, expected {}",
                index,
                embedded.record.code,
                embedded.vector.len(),
                dimension
            )));
        }
    }

    Ok(Collection {
        provider_id: artifact.metadata.provider,
        model_id: artifact.metadata.model,
        dimension,
        records: artifact.hs_codes,
    })
}

/// Session cache for the vector-less fallback dataset.
pub struct BasicDataset {
    fetcher: Arc<dyn Fetcher>,
    path: String,
    records: RwLock<Option<Arc<Vec<CodeRecord>>>>,
}

/// Wire shape of the basic dataset file; its metadata block is ignored.
#[derive(Debug, Deserialize)]
struct BasicArtifact {
    hs_codes: Vec<CodeRecord>,
}

impl BasicDataset {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_base_path(fetcher, DEFAULT_BASE_PATH)
    }

    pub fn with_base_path(fetcher: Arc<dyn Fetcher>, base_path: impl AsRef<str>) -> Self {
        Self {
            fetcher,
            path: format!("{}/{}", base_path.as_ref(), BASIC_DATASET_FILE),
            records: RwLock::new(None),
        }
    }

    /// Fetch the dataset once and serve it from memory for the rest of the
    /// session.
    pub async fn load(&self) -> Result<Arc<Vec<CodeRecord>>> {
        if let Some(records) = self.records.read().as_ref() {
            return Ok(records.clone());
        }

        let data = self.fetcher.fetch(&self.path).await?;
        let artifact: BasicArtifact = serde_json::from_slice(&data)?;
        let records = Arc::new(artifact.hs_codes);
        debug!("loaded basic dataset ({} records)", records.len());

        *self.records.write() = Some(records.clone());
        Ok(records)
    }
}
