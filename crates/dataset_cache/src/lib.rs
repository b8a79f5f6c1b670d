pub mod archive;
pub mod cache;
pub mod dataset;
pub mod error;
pub mod naming;
pub mod partition;

pub use cache::{CacheConfig, CachedDataset};
pub use dataset::{Dataset, InMemoryDataset};
pub use error::CacheError;
