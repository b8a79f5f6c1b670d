//! Configuration for cache builds.
//!
//! Example:
//! ```ignore
//! let config = CacheConfig::builder()
//!     .num_workers(4)
//!     .force_cache(false)
//!     .channel_capacity(128)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `num_workers`: more workers help when `get_example` is expensive, at the
//!   cost of memory for in-flight examples
//! - `channel_capacity`: bounds how far producers can run ahead of the
//!   archive writer; workers block when the channel is full

use crate::error::{CacheError, Result};

/// Configuration for building a cached dataset.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of parallel worker threads producing examples (must be >= 1;
    /// use 1 for a sequential build). A worker that never returns from
    /// `get_example` stalls the build indefinitely; there is no timeout.
    pub num_workers: usize,
    /// Rebuild the cache even when a valid archive already exists. Also the
    /// only way to overwrite an archive that fails to open as corrupt.
    pub force_cache: bool,
    /// Capacity of the shared worker output channel (must be > 0).
    pub channel_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            force_cache: false,
            channel_capacity: 64,
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(CacheError::invalid_config(
                "num_workers must be at least 1; use 1 for a sequential build",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(CacheError::invalid_config(
                "channel_capacity must be > 0 to prevent deadlocks",
            ));
        }
        Ok(())
    }
}

/// Builder for CacheConfig with method chaining
#[derive(Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Set the number of worker threads
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    /// Set whether to rebuild over an existing cache
    pub fn force_cache(mut self, force: bool) -> Self {
        self.config.force_cache = force;
        self
    }

    /// Set the worker output channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> CacheConfig {
        self.config
    }
}
