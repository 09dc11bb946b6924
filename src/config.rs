//! Runtime configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`Runtime`](crate::Runtime).
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Let array builtins operate directly on dense backing storage when the
    /// receiver is a standard array. Disabling forces the generic per-index path.
    pub fast_paths: bool,
    /// Maximum nesting of native function calls before a RangeError is raised.
    pub max_call_depth: usize,
    /// Index above which a write into a mostly empty array switches it to
    /// sparse storage.
    pub sparse_threshold: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fast_paths: true,
            max_call_depth: 256,
            sparse_threshold: 4096,
        }
    }
}

impl RuntimeConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the array fast paths
    pub fn with_fast_paths(mut self, enabled: bool) -> Self {
        self.fast_paths = enabled;
        self
    }

    /// Set the maximum native call depth
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the dense-to-sparse switch threshold
    pub fn with_sparse_threshold(mut self, threshold: u32) -> Self {
        self.sparse_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert!(config.fast_paths);
        assert_eq!(config.max_call_depth, 256);
        assert_eq!(config.sparse_threshold, 4096);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .with_fast_paths(false)
            .with_max_call_depth(16)
            .with_sparse_threshold(10);
        assert!(!config.fast_paths);
        assert_eq!(config.max_call_depth, 16);
        assert_eq!(config.sparse_threshold, 10);
    }

    #[test]
    fn test_partial_json() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"fast_paths": false}"#).unwrap();
        assert!(!config.fast_paths);
        assert_eq!(config.max_call_depth, 256);
    }
}
