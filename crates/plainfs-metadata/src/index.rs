//! Ordered local-path to remote-prefix index
//!
//! Keys are slash-terminated local directory paths, so all descendants of a
//! directory sort contiguously right after it. Range scans starting at a
//! directory stop at the first key that no longer shares its prefix and
//! never touch unrelated parts of the map.
//!
//! One `RwLock` guards the map for its whole life after bootstrap: listings
//! hold the shared side for one bounded scan, directory creation holds the
//! exclusive side for one insertion.

use parking_lot::RwLock;
use plainfs_common::{LocalPath, RemotePrefix, SEPARATOR};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// Result of inserting a mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The mapping was added
    Inserted,
    /// The local path was already mapped; the index is unchanged
    AlreadyMapped(RemotePrefix),
}

/// Shared index of directory mappings
#[derive(Debug, Default)]
pub struct PathPrefixIndex {
    map: RwLock<BTreeMap<LocalPath, RemotePrefix>>,
}

impl PathPrefixIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over a map built without locking
    pub fn from_map(map: BTreeMap<LocalPath, RemotePrefix>) -> Self {
        Self {
            map: RwLock::new(map),
        }
    }

    /// Number of mapped directories
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Check if no directory is mapped
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Remote prefix of a directory
    pub fn get(&self, local_path: &LocalPath) -> Option<RemotePrefix> {
        self.map.read().get(local_path).cloned()
    }

    /// Check if a directory is mapped
    pub fn contains(&self, local_path: &LocalPath) -> bool {
        self.map.read().contains_key(local_path)
    }

    /// Insert a mapping unless the local path is already taken.
    ///
    /// Existing mappings are never overwritten.
    pub fn insert(&self, local_path: LocalPath, remote_prefix: RemotePrefix) -> InsertOutcome {
        use std::collections::btree_map::Entry;

        match self.map.write().entry(local_path) {
            Entry::Vacant(slot) => {
                slot.insert(remote_prefix);
                InsertOutcome::Inserted
            }
            Entry::Occupied(existing) => InsertOutcome::AlreadyMapped(existing.get().clone()),
        }
    }

    /// Reverse lookup from remote prefix to the name of each mapped directory
    /// exactly one level below `local_path`.
    ///
    /// Deeper descendants are passed over; the scan ends at the first key
    /// outside `local_path`.
    pub fn direct_subdirectories(&self, local_path: &LocalPath) -> HashMap<RemotePrefix, String> {
        let map = self.map.read();
        let mut subdirs = HashMap::new();

        for (key, prefix) in Self::scan_below(&map, local_path) {
            let rest = &key.as_str()[local_path.as_str().len()..];
            if rest.matches(SEPARATOR).count() != 1 {
                continue;
            }
            let name = rest.strip_suffix(SEPARATOR).unwrap_or(rest);
            subdirs.insert(prefix.clone(), name.to_string());
        }

        subdirs
    }

    /// Deepest mapped directory that is `local_path` itself or one of its
    /// ancestors, together with the segments leading from it to `local_path`.
    ///
    /// Returns `None` as the prefix when no ancestor is mapped; the segments
    /// then spell out the whole path.
    pub fn longest_mapped_prefix(
        &self,
        local_path: &LocalPath,
    ) -> (Option<RemotePrefix>, Vec<String>) {
        let map = self.map.read();
        let mut suffix = Vec::new();
        let mut current = local_path.clone();

        while !current.is_root() {
            if let Some(prefix) = map.get(&current) {
                suffix.reverse();
                return (Some(prefix.clone()), suffix);
            }
            if let Some(name) = current.name() {
                suffix.push(name.to_string());
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        suffix.reverse();
        (None, suffix)
    }

    /// Copy of every mapping, in local path order
    pub fn snapshot(&self) -> Vec<(LocalPath, RemotePrefix)> {
        self.map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn scan_below<'a>(
        map: &'a BTreeMap<LocalPath, RemotePrefix>,
        local_path: &'a LocalPath,
    ) -> impl Iterator<Item = (&'a LocalPath, &'a RemotePrefix)> + 'a {
        map.range::<str, _>((Bound::Excluded(local_path.as_str()), Bound::Unbounded))
            .take_while(move |(k, _)| k.as_str().starts_with(local_path.as_str()))
    }
}
