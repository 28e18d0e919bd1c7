//! Filesystem-backed object store
//!
//! Each key maps to a regular file below a root directory, with `/` in the
//! key becoming a directory level. Listings walk the directory tree lazily,
//! starting at the deepest directory that the listed prefix fully names.

use super::{ObjectEntry, ObjectStorage};
use crate::keys::ObjectKeyGenerator;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt, future};
use parking_lot::RwLock;
use plainfs_common::{Error, Result};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Object store persisted as files under a local directory
pub struct LocalObjectStorage {
    root: PathBuf,
    key_prefix: String,
    keys_generator: RwLock<Option<Arc<dyn ObjectKeyGenerator>>>,
}

/// Pending state of a directory walk
struct Walk {
    dirs: Vec<PathBuf>,
    found: VecDeque<ObjectEntry>,
}

impl LocalObjectStorage {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>, key_prefix: impl Into<String>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!("Opened local object store at {}", root.display());
        Ok(Self {
            root,
            key_prefix: key_prefix.into(),
            keys_generator: RwLock::new(None),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(Error::storage(format!("unsupported object key: {key:?}")));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
        Some(segments?.join("/"))
    }

    /// Deepest directory that contains every key starting with `prefix`
    fn walk_start(&self, prefix: &str) -> PathBuf {
        let mut dir = self.root.clone();
        if let Some((dirs, _)) = prefix.rsplit_once('/') {
            for segment in dirs.split('/').filter(|s| !s.is_empty()) {
                dir.push(segment);
            }
        }
        dir
    }

    async fn next_entry(&self, mut walk: Walk) -> Result<Option<(ObjectEntry, Walk)>> {
        loop {
            if let Some(entry) = walk.found.pop_front() {
                return Ok(Some((entry, walk)));
            }
            let Some(dir) = walk.dirs.pop() else {
                return Ok(None);
            };

            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                // Removed by a concurrent writer, or the prefix names nothing
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(child) = read_dir.next_entry().await? {
                let file_type = child.file_type().await?;
                let path = child.path();
                if file_type.is_dir() {
                    walk.dirs.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    let size = match child.metadata().await {
                        Ok(metadata) => metadata.len(),
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => return Err(e.into()),
                    };
                    walk.found.push_back(ObjectEntry::new(key, size));
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    fn name(&self) -> &str {
        "local"
    }

    fn common_key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn is_write_once(&self) -> bool {
        false
    }

    fn list(&self, prefix: &str, limit: Option<usize>) -> BoxStream<'_, Result<ObjectEntry>> {
        let prefix = prefix.to_string();
        let walk = Walk {
            dirs: vec![self.walk_start(&prefix)],
            found: VecDeque::new(),
        };
        stream::try_unfold(walk, move |walk| self.next_entry(walk))
            .try_filter(move |entry| future::ready(entry.key.starts_with(prefix.as_str())))
            .take(limit.unwrap_or(usize::MAX))
            .boxed()
    }

    async fn read(&self, key: &str) -> Result<Bytes> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn set_keys_generator(&self, generator: Arc<dyn ObjectKeyGenerator>) {
        *self.keys_generator.write() = Some(generator);
    }

    fn keys_generator(&self) -> Option<Arc<dyn ObjectKeyGenerator>> {
        self.keys_generator.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_read_list() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStorage::open(dir.path(), "data").await.unwrap();

        store
            .write("data/a/prefix.path", Bytes::from_static(b"a/"))
            .await
            .unwrap();
        store
            .write("data/a/b/file", Bytes::from_static(b"12345"))
            .await
            .unwrap();
        store
            .write("data/ab/file", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert_eq!(
            store.read("data/a/prefix.path").await.unwrap(),
            Bytes::from_static(b"a/")
        );

        let mut under_a: Vec<ObjectEntry> = store.list("data/a/", None).try_collect().await.unwrap();
        under_a.sort_by(|l, r| l.key.cmp(&r.key));
        assert_eq!(
            under_a,
            vec![
                ObjectEntry::new("data/a/b/file", 5),
                ObjectEntry::new("data/a/prefix.path", 2),
            ]
        );

        let mut everything: Vec<String> = store
            .list("data/", None)
            .map_ok(|e| e.key)
            .try_collect()
            .await
            .unwrap();
        everything.sort();
        assert_eq!(
            everything,
            vec!["data/a/b/file", "data/a/prefix.path", "data/ab/file"]
        );

        // A partial last segment matches by key prefix, not by directory
        let partial: Vec<ObjectEntry> = store.list("data/a", None).try_collect().await.unwrap();
        assert_eq!(partial.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStorage::open(dir.path(), "").await.unwrap();

        assert!(store.read("absent/key").await.unwrap_err().is_not_found());
        assert!(!store.exists("absent/key").await.unwrap());

        let listed: Vec<ObjectEntry> = store.list("absent/", None).try_collect().await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStorage::open(dir.path(), "").await.unwrap();

        let err = store
            .write("../escape", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
