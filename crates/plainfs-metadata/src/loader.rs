//! Bootstrap scan of directory markers
//!
//! Lists every object below the store's common key prefix, reads each
//! `prefix.path` marker on a bounded set of tokio tasks and builds the
//! local-path to remote-prefix map from their contents.
//!
//! # Failure handling
//! - A marker that disappears between listing and reading is skipped; the
//!   store may be modified concurrently by another writer
//! - Two markers claiming the same local path keep one mapping according to
//!   [`DuplicateMappingPolicy`] and log a warning naming both prefixes
//! - Any other read or listing failure fails the load, but only after every
//!   task already started has finished; the first failure is returned

use crate::index::PathPrefixIndex;
use crate::marker::{is_marker_key, read_marker, remote_prefix_of};
use crate::store::ObjectStorage;
use futures::StreamExt;
use plainfs_common::{
    DuplicateMappingPolicy, Error, LocalPath, MetadataConfig, RemotePrefix, Result, directory_key,
};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Counters collected during one bootstrap scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Objects seen in the listing
    pub listed_objects: usize,
    /// Marker objects found in the listing
    pub markers: usize,
    /// Markers removed before they could be read
    pub vanished: usize,
    /// Markers rejected because their local path was already mapped
    pub duplicates: usize,
}

type MarkerResult = Result<Option<(LocalPath, RemotePrefix)>>;

/// Scan `root` for markers and build the directory index.
///
/// The map is filled without locking by this function alone and handed to
/// the returned index once every task has finished. On success the
/// directory count is added to the store's directory-map gauge.
pub async fn load_path_prefix_map(
    store: Arc<dyn ObjectStorage>,
    root: &str,
    config: &MetadataConfig,
) -> Result<(PathPrefixIndex, LoadStats)> {
    config.validate()?;
    let root = directory_key(root);
    debug!("Loading metadata from store '{}' under '{}'", store.name(), root);

    let permits = Arc::new(Semaphore::new(config.load_concurrency));
    let mut tasks: JoinSet<MarkerResult> = JoinSet::new();
    let mut stats = LoadStats::default();
    let mut first_error: Option<Error> = None;

    let mut listing = store.list(&root, None);
    while let Some(next) = listing.next().await {
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                first_error = Some(e);
                break;
            }
        };
        stats.listed_objects += 1;

        if !is_marker_key(&entry.key) {
            continue;
        }
        let Some(remote_prefix) = remote_prefix_of(&entry.key) else {
            warn!("Ignoring marker '{}' without a parent prefix", entry.key);
            continue;
        };
        stats.markers += 1;

        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                first_error = Some(Error::internal(format!("marker load pool closed: {e}")));
                break;
            }
        };
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            let _permit = permit;
            match read_marker(store.as_ref(), &entry.key).await {
                Ok(local_path) => Ok(Some((local_path, remote_prefix))),
                Err(e) if e.is_not_found() => {
                    debug!("Marker '{}' was removed before it could be read", entry.key);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        });
    }
    drop(listing);

    let mut map = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .map_err(|e| Error::internal(format!("marker load task failed: {e}")))
            .and_then(|result| result);

        match result {
            Ok(Some((local_path, remote_prefix))) => {
                insert_mapping(
                    &mut map,
                    local_path,
                    remote_prefix,
                    config.duplicate_policy,
                    &mut stats,
                );
            }
            Ok(None) => stats.vanished += 1,
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => debug!("Additional marker load failure: {}", e),
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    debug!(
        "Loaded metadata for {} objects, found {} directories",
        stats.listed_objects,
        map.len()
    );
    store.metadata_metrics().add_directories(map.len());

    Ok((PathPrefixIndex::from_map(map), stats))
}

fn insert_mapping(
    map: &mut BTreeMap<LocalPath, RemotePrefix>,
    local_path: LocalPath,
    remote_prefix: RemotePrefix,
    policy: DuplicateMappingPolicy,
    stats: &mut LoadStats,
) {
    match map.entry(local_path) {
        Entry::Vacant(slot) => {
            slot.insert(remote_prefix);
        }
        Entry::Occupied(mut existing) => {
            stats.duplicates += 1;
            let replace = policy == DuplicateMappingPolicy::LowestRemotePrefix
                && remote_prefix < *existing.get();
            if replace {
                let rejected = existing.insert(remote_prefix);
                warn!(
                    "The local path '{}' is mapped to remote prefix '{}', ignoring: '{}'",
                    existing.key(),
                    existing.get(),
                    rejected
                );
            } else {
                warn!(
                    "The local path '{}' is already mapped to remote prefix '{}', ignoring: '{}'",
                    existing.key(),
                    existing.get(),
                    remote_prefix
                );
            }
        }
    }
}
