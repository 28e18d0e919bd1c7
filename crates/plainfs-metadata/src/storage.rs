//! Directory metadata on a rewritable object store
//!
//! [`PlainRewritableMetadata`] owns the directory index for one store. It is
//! built by scanning the store's markers and shares the index with the
//! key generator it installs on the store, so directories created through
//! either side are visible to listings right away.

use crate::index::{InsertOutcome, PathPrefixIndex};
use crate::keys::CommonPathPrefixKeyGenerator;
use crate::loader::{LoadStats, load_path_prefix_map};
use crate::marker::write_marker;
use crate::metrics::MetadataStorageMetrics;
use crate::resolver::direct_children;
use crate::store::{ObjectEntry, ObjectStorage};
use futures::TryStreamExt;
use plainfs_common::{Error, LocalPath, MetadataConfig, RemotePrefix, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Directory metadata layer for a rewritable object store
pub struct PlainRewritableMetadata {
    store: Arc<dyn ObjectStorage>,
    index: Arc<PathPrefixIndex>,
    keys: Arc<CommonPathPrefixKeyGenerator>,
    metrics: MetadataStorageMetrics,
    load_stats: LoadStats,
}

impl PlainRewritableMetadata {
    /// Load the directory index of `store` and take over its key generation.
    ///
    /// Fails before scanning anything if the store is write-once, and fails
    /// as a whole if the scan fails.
    pub async fn open(store: Arc<dyn ObjectStorage>, config: &MetadataConfig) -> Result<Self> {
        config.validate()?;
        if store.is_write_once() {
            return Err(Error::configuration(format!(
                "rewritable metadata is not compatible with write-once storage '{}'",
                store.name()
            )));
        }

        let key_prefix = store.common_key_prefix().to_string();
        let (index, load_stats) =
            load_path_prefix_map(Arc::clone(&store), &key_prefix, config).await?;
        let index = Arc::new(index);

        let keys = Arc::new(CommonPathPrefixKeyGenerator::new(
            key_prefix,
            Arc::clone(&index),
            config.random_suffix_len,
        ));
        store.set_keys_generator(keys.clone());

        info!(
            "Opened metadata for store '{}': {} directories",
            store.name(),
            index.len()
        );

        Ok(Self {
            metrics: store.metadata_metrics(),
            store,
            index,
            keys,
            load_stats,
        })
    }

    /// Names of the files and subdirectories directly inside `local_path`
    pub async fn direct_children(&self, local_path: &LocalPath) -> Result<HashSet<String>> {
        let storage_key = self.keys.lookup_directory_prefix(local_path).storage_key();
        let remote_paths: Vec<ObjectEntry> =
            self.store.list(&storage_key, None).try_collect().await?;

        Ok(direct_children(
            &storage_key,
            &remote_paths,
            local_path,
            &self.index,
        ))
    }

    /// Create a directory: allocate its remote prefix, write the marker and
    /// record the mapping.
    ///
    /// The parent directory must already exist, so every mapped directory
    /// stays reachable from the listing of its parent.
    pub async fn create_directory(&self, local_path: &LocalPath) -> Result<RemotePrefix> {
        if local_path.is_root() || self.index.contains(local_path) {
            return Err(Error::DirectoryAlreadyExists(local_path.to_string()));
        }
        if let Some(parent) = local_path.parent()
            && !self.directory_exists(&parent)
        {
            return Err(Error::DirectoryNotFound(parent.to_string()));
        }

        let prefix = self.keys.directory_prefix(local_path);
        write_marker(self.store.as_ref(), &prefix, local_path).await?;

        match self.index.insert(local_path.clone(), prefix.clone()) {
            InsertOutcome::Inserted => {
                self.metrics.add_directories(1);
                debug!("Created directory '{}' at '{}'", local_path, prefix);
                Ok(prefix)
            }
            // Lost a race against a concurrent creator of the same path
            InsertOutcome::AlreadyMapped(existing) => {
                debug!(
                    "Directory '{}' was created concurrently at '{}', ignoring '{}'",
                    local_path, existing, prefix
                );
                Err(Error::DirectoryAlreadyExists(local_path.to_string()))
            }
        }
    }

    /// Check if a directory is mapped
    pub fn directory_exists(&self, local_path: &LocalPath) -> bool {
        local_path.is_root() || self.index.contains(local_path)
    }

    /// Remote prefix recorded for a directory
    pub fn remote_prefix(&self, local_path: &LocalPath) -> Option<RemotePrefix> {
        self.index.get(local_path)
    }

    /// Object key a local file is stored under
    pub fn object_key(&self, local_file: &str) -> Result<String> {
        self.keys.file_key(local_file)
    }

    /// Number of mapped directories
    pub fn directory_count(&self) -> usize {
        self.index.len()
    }

    /// Every mapping, in local path order
    pub fn mappings(&self) -> Vec<(LocalPath, RemotePrefix)> {
        self.index.snapshot()
    }

    /// Shared directory index
    pub fn index(&self) -> &Arc<PathPrefixIndex> {
        &self.index
    }

    /// Backing object store
    pub fn store(&self) -> &Arc<dyn ObjectStorage> {
        &self.store
    }

    /// Counters from the bootstrap scan
    pub const fn load_stats(&self) -> LoadStats {
        self.load_stats
    }
}

impl Drop for PlainRewritableMetadata {
    fn drop(&mut self) {
        self.metrics.sub_directories(self.index.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryObjectStorage;
    use bytes::Bytes;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

    fn dir(path: &str) -> LocalPath {
        LocalPath::directory(path).unwrap()
    }

    fn sorted(children: HashSet<String>) -> Vec<String> {
        let mut names: Vec<String> = children.into_iter().collect();
        names.sort();
        names
    }

    async fn open(store: Arc<InMemoryObjectStorage>) -> PlainRewritableMetadata {
        PlainRewritableMetadata::open(store, &MetadataConfig::default())
            .await
            .unwrap()
    }

    fn gauge_value(snapshotter: &Snapshotter, name: &str) -> Option<f64> {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| match value {
                DebugValue::Gauge(v) if key.key().name() == name => Some(v.0),
                _ => None,
            })
    }

    #[test]
    fn test_directory_map_gauge() {
        const GAUGE: &str = "plainfs_test_directory_map_size";
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        ::metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let store = Arc::new(InMemoryObjectStorage::new("data").with_metrics(
                    MetadataStorageMetrics {
                        directory_map_size: GAUGE,
                    },
                ));
                store.insert("data/a/prefix.path", "a/");
                store.insert("data/a/rnd/prefix.path", "a/b/");

                let metadata = open(store).await;
                assert_eq!(gauge_value(&snapshotter, GAUGE), Some(2.0));

                metadata.create_directory(&dir("a/c")).await.unwrap();
                assert_eq!(gauge_value(&snapshotter, GAUGE), Some(3.0));

                // A rejected creation leaves the gauge alone
                assert!(metadata.create_directory(&dir("a/c")).await.is_err());
                assert_eq!(gauge_value(&snapshotter, GAUGE), Some(3.0));

                drop(metadata);
                assert_eq!(gauge_value(&snapshotter, GAUGE), Some(0.0));
            });
        });
    }

    #[tokio::test]
    async fn test_write_once_store_rejected() {
        let store = Arc::new(InMemoryObjectStorage::new("data").write_once());
        let result = PlainRewritableMetadata::open(store.clone(), &MetadataConfig::default()).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(store.keys_generator().is_none());
    }

    #[tokio::test]
    async fn test_failed_load_fails_open() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        store.insert("data/a/prefix.path", Bytes::from_static(&[0xc3, 0x28]));
        let result = PlainRewritableMetadata::open(store, &MetadataConfig::default()).await;
        assert!(matches!(result, Err(Error::InvalidMarker { .. })));
    }

    #[tokio::test]
    async fn test_bootstrap_and_list() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        store.insert("data/store/prefix.path", "store/");
        store.insert("data/store/qzjtwmkduyoprhsa/prefix.path", "store/t1/");
        store.insert("data/store/qzjtwmkduyoprhsa/columns.txt", "c");
        store.insert("data/store/t2/data.bin", "d");
        store.insert("data/store/format_version.txt", "1");

        let metadata = open(store).await;
        assert_eq!(metadata.directory_count(), 2);
        assert_eq!(metadata.load_stats().markers, 2);

        assert_eq!(
            sorted(metadata.direct_children(&dir("store")).await.unwrap()),
            vec!["format_version.txt", "t1", "t2"]
        );
        assert_eq!(
            sorted(metadata.direct_children(&dir("store/t1")).await.unwrap()),
            vec!["columns.txt"]
        );
        assert_eq!(
            sorted(metadata.direct_children(&LocalPath::root()).await.unwrap()),
            vec!["store"]
        );
        assert!(
            metadata
                .direct_children(&dir("missing"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_create_directory_is_visible_to_listing() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        let metadata = open(store.clone()).await;

        let top = metadata.create_directory(&dir("store")).await.unwrap();
        assert_eq!(top.as_str(), "data/store");

        let nested = metadata.create_directory(&dir("store/t1")).await.unwrap();
        assert!(nested.as_str().starts_with("data/store/"));
        assert_ne!(nested.as_str(), "data/store/t1");

        assert_eq!(
            store
                .read(&format!("{}/prefix.path", nested.as_str()))
                .await
                .unwrap(),
            Bytes::from_static(b"store/t1/")
        );

        let file_key = metadata.object_key("store/t1/part.bin").unwrap();
        assert_eq!(file_key, format!("{}/part.bin", nested.as_str()));
        store.write(&file_key, Bytes::from_static(b"x")).await.unwrap();

        assert_eq!(
            sorted(metadata.direct_children(&dir("store")).await.unwrap()),
            vec!["t1"]
        );
        assert_eq!(
            sorted(metadata.direct_children(&dir("store/t1")).await.unwrap()),
            vec!["part.bin"]
        );
        assert!(metadata.directory_exists(&dir("store/t1")));
        assert_eq!(metadata.remote_prefix(&dir("store/t1")), Some(nested));
    }

    #[tokio::test]
    async fn test_create_existing_directory_fails() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        let metadata = open(store).await;

        metadata.create_directory(&dir("a")).await.unwrap();
        let err = metadata.create_directory(&dir("a")).await.unwrap_err();
        assert!(matches!(err, Error::DirectoryAlreadyExists(_)));
        assert!(metadata.create_directory(&LocalPath::root()).await.is_err());
        assert_eq!(metadata.directory_count(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_existing_parent() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        let metadata = open(store.clone()).await;
        metadata.create_directory(&dir("a")).await.unwrap();

        let err = metadata.create_directory(&dir("a/x/y")).await.unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(ref parent) if parent == "a/x/"));
        assert!(!metadata.directory_exists(&dir("a/x/y")));
        assert!(!store.exists("data/a/x/prefix.path").await.unwrap());
        assert_eq!(metadata.directory_count(), 1);

        // Creating the levels in order keeps every one of them listable
        let x = metadata.create_directory(&dir("a/x")).await.unwrap();
        let y = metadata.create_directory(&dir("a/x/y")).await.unwrap();
        assert!(y.as_str().starts_with(&x.storage_key()));
        assert_eq!(
            sorted(metadata.direct_children(&dir("a")).await.unwrap()),
            vec!["x"]
        );
        assert_eq!(
            sorted(metadata.direct_children(&dir("a/x")).await.unwrap()),
            vec!["y"]
        );
    }

    #[tokio::test]
    async fn test_reopen_sees_created_directories() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        let created = {
            let metadata = open(store.clone()).await;
            metadata.create_directory(&dir("db")).await.unwrap();
            metadata.create_directory(&dir("db/t")).await.unwrap()
        };

        let reopened = open(store).await;
        assert_eq!(reopened.directory_count(), 2);
        assert_eq!(reopened.remote_prefix(&dir("db/t")), Some(created));
        assert_eq!(
            sorted(reopened.direct_children(&dir("db")).await.unwrap()),
            vec!["t"]
        );
    }

    #[tokio::test]
    async fn test_store_generator_shares_index() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        let metadata = open(store.clone()).await;
        let generator = store.keys_generator().unwrap();

        let prefix = metadata.create_directory(&dir("s")).await.unwrap();
        assert_eq!(generator.generate("s/", true).unwrap(), prefix.as_str());

        // Insertions made through the shared handle show up in listings
        metadata
            .index()
            .insert(dir("s/x"), RemotePrefix::new("data/s/remapped"));
        store.insert("data/s/remapped/f", "1");
        assert_eq!(
            sorted(metadata.direct_children(&dir("s")).await.unwrap()),
            vec!["x"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_and_list() {
        let store = Arc::new(InMemoryObjectStorage::new("data"));
        let metadata = Arc::new(open(store).await);
        metadata.create_directory(&dir("t")).await.unwrap();

        let mut handles = Vec::new();
        for w in 0..4 {
            let metadata = Arc::clone(&metadata);
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    metadata
                        .create_directory(&dir(&format!("t/w{w}_{i}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for _ in 0..4 {
            let metadata = Arc::clone(&metadata);
            handles.push(tokio::spawn(async move {
                let mut seen = 0;
                for _ in 0..25 {
                    let children = metadata.direct_children(&dir("t")).await.unwrap();
                    let mapped = children.iter().filter(|name| name.starts_with('w')).count();
                    assert!(mapped >= seen);
                    seen = mapped;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(metadata.direct_children(&dir("t")).await.unwrap().len(), 100);
    }
}
