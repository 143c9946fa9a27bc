//! Resource access abstraction.
//!
//! The store loads artifacts through the [`Fetcher`] trait so that the same
//! loading logic runs against local files, bundled in-memory data, or any
//! other transport a caller plugs in. A fetch failure is simply an error;
//! the store decides what to try next.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;

/// Read-only access to named resources.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full contents of the resource at `path`.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Fetcher reading resources relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Fetcher for FsFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        Ok(tokio::fs::read(&full).await?)
    }
}

/// In-memory fetcher.
///
/// Serves bundled datasets and doubles as the test fixture transport.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource.
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        self.entries.write().insert(path.into(), data);
    }

    /// Remove a resource.
    pub fn remove(&self, path: &str) {
        self.entries.write().remove(path);
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.entries.read().get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such resource: {path}"),
            )
            .into()
        })
    }
}
