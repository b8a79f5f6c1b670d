use anyhow::{anyhow, Result};
use dataset_cache::Dataset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Example type with enough structure to catch serialization mix-ups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub index: usize,
    pub value: i64,
}

/// Deterministic dataset fixture: example `i` has value `i * multiplier`.
///
/// Counts every `get_example` call so tests can prove a cache hit performed
/// no recomputation, and can be told to fail at one index to exercise the
/// build-abort path.
#[derive(Debug)]
pub struct CountingDataset {
    root: PathBuf,
    name: String,
    len: usize,
    multiplier: i64,
    fail_at: Option<usize>,
    panic_at: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl CountingDataset {
    pub fn new(root: &Path, len: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            name: "numbers".to_string(),
            len,
            multiplier: 3,
            fail_at: None,
            panic_at: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_multiplier(mut self, multiplier: i64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn panicking_at(mut self, index: usize) -> Self {
        self.panic_at = Some(index);
        self
    }

    /// Handle on the `get_example` call counter; stays valid after the
    /// dataset is moved into a cache.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Dataset for CountingDataset {
    type Example = Record;
    type Labels = Vec<String>;

    fn len(&self) -> usize {
        self.len
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_example(&self, index: usize) -> Result<Record> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.panic_at == Some(index) {
            panic!("synthetic panic at index {index}");
        }
        if self.fail_at == Some(index) {
            return Err(anyhow!("synthetic failure at index {index}"));
        }
        if index >= self.len {
            return Err(anyhow!("index {index} out of range"));
        }

        Ok(Record {
            index,
            value: index as i64 * self.multiplier,
        })
    }

    fn labels(&self) -> Result<Vec<String>> {
        Ok((0..self.len).map(|i| format!("label-{i}")).collect())
    }
}
