//! Core type definitions for PlainFS
//!
//! Two string tokens travel between the metadata layer and the object store:
//! [`LocalPath`], the hierarchical directory path the storage engine uses, and
//! [`RemotePrefix`], the key segment under which the store groups the objects
//! of one directory. They are kept as distinct types so a local path can never
//! be handed to the store as a key, or the other way round.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Path separator for both local paths and object keys
pub const SEPARATOR: char = '/';

/// Local directory path, always slash-terminated.
///
/// The root directory is the empty path. Leading separators are dropped, so
/// `"/a/b"`, `"a/b"` and `"a/b/"` all normalize to `"a/b/"`. Because every
/// non-root path ends with a separator, lexicographic order places all
/// descendants of a directory right after it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(try_from = "String", into = "String")]
pub struct LocalPath(String);

impl LocalPath {
    /// The root directory
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Create a directory path, normalizing separators
    pub fn directory(path: impl AsRef<str>) -> Result<Self, LocalPathError> {
        let trimmed = path.as_ref().trim_start_matches(SEPARATOR);
        let trimmed = trimmed.strip_suffix(SEPARATOR).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        for segment in trimmed.split(SEPARATOR) {
            Self::validate_segment(segment)?;
        }

        let mut normalized = String::with_capacity(trimmed.len() + 1);
        normalized.push_str(trimmed);
        normalized.push(SEPARATOR);
        Ok(Self(normalized))
    }

    /// Split a file path into its parent directory and file name
    pub fn split_file(path: impl AsRef<str>) -> Result<(Self, String), LocalPathError> {
        let trimmed = path.as_ref().trim_start_matches(SEPARATOR);
        if trimmed.is_empty() || trimmed.ends_with(SEPARATOR) {
            return Err(LocalPathError::NotAFile(path.as_ref().to_string()));
        }

        match trimmed.rsplit_once(SEPARATOR) {
            Some((parent, name)) => {
                Self::validate_segment(name)?;
                Ok((Self::directory(parent)?, name.to_string()))
            }
            None => {
                Self::validate_segment(trimmed)?;
                Ok((Self::root(), trimmed.to_string()))
            }
        }
    }

    fn validate_segment(segment: &str) -> Result<(), LocalPathError> {
        match segment {
            "" => Err(LocalPathError::EmptySegment),
            "." | ".." => Err(LocalPathError::RelativeSegment(segment.to_string())),
            _ => Ok(()),
        }
    }

    /// Get the path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the root directory
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments from the top-level directory down
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split_terminator(SEPARATOR)
    }

    /// Last path segment, `None` for the root
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent directory, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let without_slash = self.0.strip_suffix(SEPARATOR)?;
        let parent = match without_slash.rfind(SEPARATOR) {
            Some(pos) => &without_slash[..=pos],
            None => "",
        };
        Some(Self(parent.to_string()))
    }

    /// Child directory one segment below this one
    pub fn child(&self, name: &str) -> Result<Self, LocalPathError> {
        if name.contains(SEPARATOR) {
            return Err(LocalPathError::NestedSegment(name.to_string()));
        }
        Self::validate_segment(name)?;
        Ok(Self(format!("{}{name}{SEPARATOR}", self.0)))
    }
}

impl Borrow<str> for LocalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LocalPath {
    type Error = LocalPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::directory(value)
    }
}

impl From<LocalPath> for String {
    fn from(path: LocalPath) -> Self {
        path.0
    }
}

impl fmt::Debug for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalPath({:?})", self.0)
    }
}

/// Errors that can occur when creating a local path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalPathError {
    #[error("path contains an empty segment")]
    EmptySegment,
    #[error("path contains a relative segment: {0:?}")]
    RelativeSegment(String),
    #[error("directory name contains a separator: {0:?}")]
    NestedSegment(String),
    #[error("not a file path: {0:?}")]
    NotAFile(String),
}

/// Remote prefix under which one directory's objects are stored.
///
/// Holds the full object key of the directory, including the store's common
/// key prefix, without a trailing separator. The prefix is opaque: nothing
/// about the local path can be derived from it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct RemotePrefix(String);

impl RemotePrefix {
    /// Create a remote prefix, dropping trailing separators
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with(SEPARATOR) {
            prefix.pop();
        }
        Self(prefix)
    }

    /// Get the prefix as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key prefix shared by every object stored in this directory
    #[must_use]
    pub fn storage_key(&self) -> String {
        directory_key(&self.0)
    }

    /// Full key of an object named `name` inside this directory
    #[must_use]
    pub fn object_key(&self, name: &str) -> String {
        join_key(&self.0, name)
    }
}

impl Borrow<str> for RemotePrefix {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RemotePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemotePrefix({:?})", self.0)
    }
}

/// Join two key fragments with exactly one separator between them
#[must_use]
pub fn join_key(base: &str, part: &str) -> String {
    let base = base.trim_end_matches(SEPARATOR);
    let part = part.trim_start_matches(SEPARATOR);
    if base.is_empty() {
        return part.to_string();
    }
    format!("{base}{SEPARATOR}{part}")
}

/// Key prefix listing everything below `key`: the key with a trailing
/// separator, or the empty string for the bucket root
#[must_use]
pub fn directory_key(key: &str) -> String {
    let key = key.trim_end_matches(SEPARATOR);
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}{SEPARATOR}")
    }
}
