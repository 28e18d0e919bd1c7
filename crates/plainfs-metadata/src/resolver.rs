//! Direct children of a local directory
//!
//! A directory's objects are listed flat: every key below its storage key,
//! at any depth. Keys without a further separator are files. For deeper keys
//! the first segment below the storage key names a subdirectory, which was
//! stored either under a remapped prefix recorded in the index, or under its
//! own literal name.

use crate::index::PathPrefixIndex;
use crate::marker::PREFIX_PATH_FILE_NAME;
use crate::store::ObjectEntry;
use plainfs_common::{LocalPath, SEPARATOR};
use std::collections::HashSet;

/// Names of the files and subdirectories directly inside `local_path`.
///
/// `storage_key` is the key prefix of the directory's objects (its remote
/// prefix followed by a separator) and `remote_paths` a flat listing below
/// it. The marker object is never reported, and a subdirectory reached
/// through several objects is reported once.
pub fn direct_children(
    storage_key: &str,
    remote_paths: &[ObjectEntry],
    local_path: &LocalPath,
    index: &PathPrefixIndex,
) -> HashSet<String> {
    let remote_to_local_subdir = index.direct_subdirectories(local_path);
    let mut children = HashSet::new();

    for entry in remote_paths {
        debug_assert!(
            entry.key.starts_with(storage_key),
            "{} is not below {}",
            entry.key,
            storage_key
        );
        let Some(child) = entry.key.strip_prefix(storage_key) else {
            continue;
        };

        match child.find(SEPARATOR) {
            // File names
            None => {
                if !child.is_empty() && child != PREFIX_PATH_FILE_NAME {
                    children.insert(child.to_string());
                }
            }
            // Subdirectories
            Some(slash_pos) => {
                let remote_subdir = &entry.key[..storage_key.len() + slash_pos];
                match remote_to_local_subdir.get(remote_subdir) {
                    Some(local_name) => {
                        children.insert(local_name.clone());
                    }
                    // The remote subdirectory name is the same as the local one
                    None if slash_pos > 0 => {
                        children.insert(child[..slash_pos].to_string());
                    }
                    None => {}
                }
            }
        }
    }

    children
}
