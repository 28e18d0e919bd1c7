//! Metadata layer metrics
//!
//! Published through the `metrics` facade; whichever recorder the process
//! installs picks them up.
//!
//! - `plainfs_directory_map_size` - Number of local directories currently
//!   mapped to a remote prefix

/// Metric names a store reports its metadata layer under.
///
/// Several stores in one process can keep separate gauges by handing out
/// different names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataStorageMetrics {
    /// Gauge tracking the size of the local-path to remote-prefix map
    pub directory_map_size: &'static str,
}

impl Default for MetadataStorageMetrics {
    fn default() -> Self {
        Self {
            directory_map_size: "plainfs_directory_map_size",
        }
    }
}

impl MetadataStorageMetrics {
    pub(crate) fn add_directories(&self, count: usize) {
        ::metrics::gauge!(self.directory_map_size).increment(count as f64);
    }

    pub(crate) fn sub_directories(&self, count: usize) {
        ::metrics::gauge!(self.directory_map_size).decrement(count as f64);
    }
}
