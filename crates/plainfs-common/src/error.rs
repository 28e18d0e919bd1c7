//! Error types for PlainFS
//!
//! This module defines the common error type shared by the metadata layer,
//! the object store backends and the CLI.

use crate::types::LocalPathError;
use thiserror::Error;

/// Common result type for PlainFS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for PlainFS
#[derive(Debug, Error)]
pub enum Error {
    // Object store errors
    #[error("object not found: {key}")]
    ObjectNotFound { key: String },

    #[error("object already exists: {key}")]
    ObjectAlreadyExists { key: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Metadata errors
    #[error("invalid local path: {0}")]
    InvalidPath(#[from] LocalPathError),

    #[error("invalid marker object {key}: {reason}")]
    InvalidMarker { key: String, reason: String },

    #[error("directory already exists: {0}")]
    DirectoryAlreadyExists(String),

    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    // Internal errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an object-not-found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::ObjectNotFound { key: key.into() }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid marker error
    pub fn invalid_marker(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMarker {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error means the object is absent from the store.
    ///
    /// A plain `io::ErrorKind::NotFound` counts as well, so filesystem backed
    /// stores do not have to translate every error by hand.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ObjectNotFound { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::not_found("data/abc/prefix.path").is_not_found());
        assert!(Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_not_found());
        assert!(!Error::storage("timeout").is_not_found());
        assert!(!Error::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied)).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_marker("data/x/prefix.path", "not valid UTF-8");
        assert_eq!(
            err.to_string(),
            "invalid marker object data/x/prefix.path: not valid UTF-8"
        );
        assert_eq!(
            Error::DirectoryAlreadyExists("a/b/".into()).to_string(),
            "directory already exists: a/b/"
        );
        assert_eq!(
            Error::DirectoryNotFound("a/".into()).to_string(),
            "directory not found: a/"
        );
    }
}
