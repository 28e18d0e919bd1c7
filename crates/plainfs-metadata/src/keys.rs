//! Object key generation
//!
//! New objects are placed under the remote prefix of the deepest mapped
//! ancestor of their local path. Files and top-level directories keep their
//! literal names below that prefix; a nested directory gets a pseudorandom
//! last segment so its prefix is independent of its local name.

use crate::index::PathPrefixIndex;
use plainfs_common::{LocalPath, RemotePrefix, Result, join_key};
use rand::Rng;
use std::sync::Arc;

/// Places objects for local paths in the flat key space
pub trait ObjectKeyGenerator: Send + Sync {
    /// Full object key for a local file path, or the remote prefix of a
    /// local directory path when `is_directory` is set
    fn generate(&self, path: &str, is_directory: bool) -> Result<String>;
}

/// Key generator backed by the shared directory index
#[derive(Debug)]
pub struct CommonPathPrefixKeyGenerator {
    key_prefix: String,
    index: Arc<PathPrefixIndex>,
    random_suffix_len: usize,
}

impl CommonPathPrefixKeyGenerator {
    pub fn new(
        key_prefix: impl Into<String>,
        index: Arc<PathPrefixIndex>,
        random_suffix_len: usize,
    ) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            index,
            random_suffix_len,
        }
    }

    /// The index this generator consults
    pub fn index(&self) -> &Arc<PathPrefixIndex> {
        &self.index
    }

    /// Remote prefix for a directory.
    ///
    /// Mapped directories return their recorded prefix. Otherwise the prefix
    /// is built below the deepest mapped ancestor; nothing is recorded.
    pub fn directory_prefix(&self, local_path: &LocalPath) -> RemotePrefix {
        let (mapped, suffix) = self.index.longest_mapped_prefix(local_path);
        let Some((_, intermediate)) = suffix.split_last() else {
            return mapped.unwrap_or_else(|| RemotePrefix::new(self.key_prefix.clone()));
        };

        match mapped {
            // Top-level directories are mapped as is
            None => RemotePrefix::new(self.join_segments(&self.key_prefix, &suffix)),
            // Replace the last segment of a nested directory with a random one
            Some(prefix) => {
                let base = self.join_segments(prefix.as_str(), intermediate);
                RemotePrefix::new(join_key(&base, &self.random_segment()))
            }
        }
    }

    /// Remote prefix a directory's objects are found under, without
    /// allocating anything: unmapped segments are taken literally
    pub fn lookup_directory_prefix(&self, local_path: &LocalPath) -> RemotePrefix {
        let (mapped, suffix) = self.index.longest_mapped_prefix(local_path);
        let base = mapped.map_or_else(|| self.key_prefix.clone(), |p| p.as_str().to_string());
        RemotePrefix::new(self.join_segments(&base, &suffix))
    }

    /// Full object key for a file
    pub fn file_key(&self, local_file: &str) -> Result<String> {
        let (parent, name) = LocalPath::split_file(local_file)?;
        Ok(self.lookup_directory_prefix(&parent).object_key(&name))
    }

    fn join_segments(&self, base: &str, segments: &[String]) -> String {
        segments
            .iter()
            .fold(base.to_string(), |key, segment| join_key(&key, segment))
    }

    fn random_segment(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.random_suffix_len)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect()
    }
}

impl ObjectKeyGenerator for CommonPathPrefixKeyGenerator {
    fn generate(&self, path: &str, is_directory: bool) -> Result<String> {
        if is_directory {
            let local_path = LocalPath::directory(path)?;
            Ok(self.directory_prefix(&local_path).as_str().to_string())
        } else {
            self.file_key(path)
        }
    }
}
