use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A `Dataset` produces one example per index, plus a dataset-global label
/// collection.
///
/// Implementations must be `Send + Sync`: during a cache build every worker
/// thread holds the same dataset behind an `Arc` and calls `get_example`
/// concurrently. No internal synchronization beyond that is assumed.
pub trait Dataset: Send + Sync {
    /// The example type produced for each index. Examples are opaque to the
    /// cache; the serde bounds exist so workers can serialize them and
    /// readers can deserialize them back.
    type Example: Serialize + DeserializeOwned + Send + 'static;

    /// The dataset-global label collection, persisted once per cache.
    type Labels: Serialize + DeserializeOwned;

    /// Total number of examples. Must stay constant for the lifetime of the
    /// dataset; the cache is keyed off it.
    fn len(&self) -> usize;

    /// Checks if the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root directory of the raw data. The cache lives in `<root>/cached`.
    fn root(&self) -> &Path;

    /// Name of the dataset; names the cache files, so it should be unique
    /// per root.
    fn name(&self) -> &str;

    /// Produces the example at `index`. May run arbitrary transform and load
    /// code, and may block on I/O.
    fn get_example(&self, index: usize) -> Result<Self::Example>;

    /// Produces the label collection for the whole dataset.
    fn labels(&self) -> Result<Self::Labels>;
}

/// A dataset that stores all examples in contiguous memory with
/// atomic-reference counting (`Arc<[T]>`).
///
/// Cloning only bumps the `Arc` counter, so the same dataset can be handed
/// to many threads cheaply. Useful for small datasets and as an adapter when
/// examples are already materialized.
#[derive(Debug, Clone)]
pub struct InMemoryDataset<T> {
    examples: Arc<[T]>,
    labels: Arc<[String]>,
    root: PathBuf,
    name: String,
}

impl<T> InMemoryDataset<T> {
    /// Creates a new in-memory dataset rooted at `root`.
    pub fn new(examples: Vec<T>, root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            examples: examples.into(),
            labels: Arc::from(Vec::new()),
            root: root.into(),
            name: name.into(),
        }
    }

    /// Attaches per-datum labels and returns the modified dataset.
    /// Enables chaining: `dataset.with_labels(vec!["cat".into(), ..])`.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels.into();
        self
    }
}

impl<T> Dataset for InMemoryDataset<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Example = T;
    type Labels = Vec<String>;

    fn len(&self) -> usize {
        self.examples.len()
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_example(&self, index: usize) -> Result<T> {
        self.examples.get(index).cloned().ok_or_else(|| {
            anyhow!(
                "index {} out of range for dataset of length {}",
                index,
                self.examples.len()
            )
        })
    }

    fn labels(&self) -> Result<Vec<String>> {
        Ok(self.labels.to_vec())
    }
}
