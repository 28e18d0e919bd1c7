//! In-memory object store
//!
//! Ordered map of keys to immutable byte buffers. Used by tests and by
//! callers that want the metadata layer without a real bucket.

use super::{ObjectEntry, ObjectStorage};
use crate::keys::ObjectKeyGenerator;
use crate::metrics::MetadataStorageMetrics;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::RwLock;
use plainfs_common::{Error, Result};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Object store held entirely in memory
pub struct InMemoryObjectStorage {
    key_prefix: String,
    write_once: bool,
    metrics: MetadataStorageMetrics,
    objects: RwLock<BTreeMap<String, Bytes>>,
    keys_generator: RwLock<Option<Arc<dyn ObjectKeyGenerator>>>,
}

impl InMemoryObjectStorage {
    /// Create an empty rewritable store
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            write_once: false,
            metrics: MetadataStorageMetrics::default(),
            objects: RwLock::new(BTreeMap::new()),
            keys_generator: RwLock::new(None),
        }
    }

    /// Forbid overwriting existing keys
    #[must_use]
    pub fn write_once(mut self) -> Self {
        self.write_once = true;
        self
    }

    /// Report metadata metrics under different names
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetadataStorageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Put an object without going through the async interface
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(key.into(), data.into());
    }

    /// Remove an object, returning whether it existed
    pub fn remove(&self, key: &str) -> bool {
        self.objects.write().remove(key).is_some()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn common_key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn is_write_once(&self) -> bool {
        self.write_once
    }

    fn list(&self, prefix: &str, limit: Option<usize>) -> BoxStream<'_, Result<ObjectEntry>> {
        // Snapshot under the read lock; the stream itself never holds it
        let entries: Vec<ObjectEntry> = {
            let objects = self.objects.read();
            objects
                .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix))
                .take(limit.unwrap_or(usize::MAX))
                .map(|(key, data)| ObjectEntry::new(key.clone(), data.len() as u64))
                .collect()
        };
        stream::iter(entries.into_iter().map(Ok)).boxed()
    }

    async fn read(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<()> {
        let mut objects = self.objects.write();
        if self.write_once && objects.contains_key(key) {
            return Err(Error::ObjectAlreadyExists {
                key: key.to_string(),
            });
        }
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }

    fn set_keys_generator(&self, generator: Arc<dyn ObjectKeyGenerator>) {
        *self.keys_generator.write() = Some(generator);
    }

    fn keys_generator(&self) -> Option<Arc<dyn ObjectKeyGenerator>> {
        self.keys_generator.read().clone()
    }

    fn metadata_metrics(&self) -> MetadataStorageMetrics {
        self.metrics.clone()
    }
}
