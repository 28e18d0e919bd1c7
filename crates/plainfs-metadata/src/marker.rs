//! Directory marker objects
//!
//! Every remote directory prefix holds exactly one `prefix.path` object. Its
//! full content is the slash-terminated local path the prefix stands for,
//! with no framing or trailing newline.

use crate::store::ObjectStorage;
use bytes::Bytes;
use plainfs_common::{Error, LocalPath, RemotePrefix, Result};

/// Name of the marker object inside each remote directory prefix
pub const PREFIX_PATH_FILE_NAME: &str = "prefix.path";

/// Key of the marker object for `prefix`
#[must_use]
pub fn marker_key(prefix: &RemotePrefix) -> String {
    prefix.object_key(PREFIX_PATH_FILE_NAME)
}

/// Check if a key names a marker object
#[must_use]
pub fn is_marker_key(key: &str) -> bool {
    key.rsplit('/').next() == Some(PREFIX_PATH_FILE_NAME)
}

/// Remote prefix a marker key belongs to, `None` if the marker has no parent
#[must_use]
pub fn remote_prefix_of(key: &str) -> Option<RemotePrefix> {
    let (parent, name) = key.rsplit_once('/')?;
    if name != PREFIX_PATH_FILE_NAME || parent.trim_end_matches('/').is_empty() {
        return None;
    }
    Some(RemotePrefix::new(parent))
}

/// Read the local path recorded in a marker object
pub async fn read_marker(store: &dyn ObjectStorage, key: &str) -> Result<LocalPath> {
    let data = store.read(key).await?;
    let content = std::str::from_utf8(&data)
        .map_err(|e| Error::invalid_marker(key, format!("content is not UTF-8: {e}")))?;
    let local_path =
        LocalPath::directory(content).map_err(|e| Error::invalid_marker(key, e.to_string()))?;
    // The root directory lives at the common key prefix and has no marker
    if local_path.is_root() {
        return Err(Error::invalid_marker(key, "marker names the root directory"));
    }
    Ok(local_path)
}

/// Record `local_path` as the directory stored under `prefix`
pub async fn write_marker(
    store: &dyn ObjectStorage,
    prefix: &RemotePrefix,
    local_path: &LocalPath,
) -> Result<()> {
    let content = Bytes::copy_from_slice(local_path.as_str().as_bytes());
    store.write(&marker_key(prefix), content).await
}
