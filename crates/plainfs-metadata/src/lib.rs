//! PlainFS Metadata - directory hierarchy over a flat object store
//!
//! Object stores only know opaque string keys. This crate keeps a
//! hierarchical directory namespace on top of them:
//! - Every remote directory prefix holds one `prefix.path` marker object
//!   whose content is the local directory path it represents
//! - At startup the markers are scanned in parallel into an ordered
//!   local-path to remote-prefix index
//! - Directory listings merge the flat key listing of a prefix with the
//!   index, so remapped and literally named subdirectories land in one
//!   namespace
//!
//! # Layout
//!
//! ```text
//! data/store/prefix.path             -> "store/"
//! data/store/t1/prefix.path          -> "store/t1/"
//! data/store/qzjtwmkduyoprhsa/...    -> remapped "store/t2/"
//! ```

pub mod index;
pub mod keys;
pub mod loader;
pub mod marker;
pub mod metrics;
pub mod resolver;
pub mod storage;
pub mod store;

// Re-exports
pub use index::{InsertOutcome, PathPrefixIndex};
pub use keys::{CommonPathPrefixKeyGenerator, ObjectKeyGenerator};
pub use loader::{LoadStats, load_path_prefix_map};
pub use marker::{PREFIX_PATH_FILE_NAME, read_marker, write_marker};
pub use metrics::MetadataStorageMetrics;
pub use resolver::direct_children;
pub use storage::PlainRewritableMetadata;
pub use store::{InMemoryObjectStorage, LocalObjectStorage, ObjectEntry, ObjectStorage};
