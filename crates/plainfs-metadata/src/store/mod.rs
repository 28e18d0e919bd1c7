//! Object store interface
//!
//! The metadata layer talks to the backing bucket only through
//! [`ObjectStorage`]. Keys are flat strings; any `/` inside them carries no
//! meaning for the store itself.

mod local;
mod memory;

pub use local::LocalObjectStorage;
pub use memory::InMemoryObjectStorage;

use crate::keys::ObjectKeyGenerator;
use crate::metrics::MetadataStorageMetrics;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use plainfs_common::Result;
use std::sync::Arc;

/// One object returned by a listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key, including the listed prefix
    pub key: String,
    /// Object size in bytes
    pub size: u64,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Flat key-addressed object store
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &str;

    /// Key prefix shared by every object this store manages
    fn common_key_prefix(&self) -> &str;

    /// Whether existing keys can never be overwritten
    fn is_write_once(&self) -> bool;

    /// Lazily list every object whose key starts with `prefix`, at any depth.
    ///
    /// `limit` caps the number of entries; `None` lists everything.
    fn list(&self, prefix: &str, limit: Option<usize>) -> BoxStream<'_, Result<ObjectEntry>>;

    /// Read the full content of an object.
    ///
    /// Fails with an error for which `is_not_found()` holds if the key does
    /// not exist (anymore).
    async fn read(&self, key: &str) -> Result<Bytes>;

    /// Create or overwrite an object
    async fn write(&self, key: &str, data: Bytes) -> Result<()>;

    /// Check whether an object exists
    async fn exists(&self, key: &str) -> Result<bool> {
        match self.read(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Install the generator used to place new objects
    fn set_keys_generator(&self, generator: Arc<dyn ObjectKeyGenerator>);

    /// Currently installed key generator
    fn keys_generator(&self) -> Option<Arc<dyn ObjectKeyGenerator>>;

    /// Metric names the metadata layer reports under
    fn metadata_metrics(&self) -> MetadataStorageMetrics {
        MetadataStorageMetrics::default()
    }
}

