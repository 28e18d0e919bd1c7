//! PlainFS Common - Shared types and utilities
//!
//! This crate provides the error type, configuration structures and the
//! path/prefix tokens used across all PlainFS components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, DuplicateMappingPolicy, LoggingConfig, MetadataConfig};
pub use error::{Error, Result};
pub use types::*;
