//! Error types for cache operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or reading a dataset cache.
///
/// Build-time errors are fatal to the build call: a failed build never leaves
/// an archive at the final path. Read-time errors are fatal only to the
/// individual read.
#[derive(Debug, Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cache configuration is unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// A worker failed to produce an example, or the build protocol broke
    /// down. The whole build is aborted.
    #[error("cache build failed: {message}")]
    Build {
        /// Description of the failure, including the worker and index.
        message: String,
    },

    /// A read requested a key absent from an otherwise-open archive.
    ///
    /// This signals cache/source inconsistency, typically a dataset whose
    /// length changed since the cache was built.
    #[error("archive entry '{key}' not found")]
    EntryNotFound {
        /// The missing entry key.
        key: String,
    },

    /// The archive file exists but cannot be opened or parsed.
    ///
    /// Surfaced as-is rather than treated as a cache miss; rebuilding over a
    /// corrupt file requires an explicit `force_cache`.
    #[error("corrupt archive at {path}: {reason}")]
    CorruptArchive {
        /// The archive file path.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// `get_example` was called with an index outside `[0, len)`.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The dataset length.
        len: usize,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

// Convenience constructors
impl CacheError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }
}
