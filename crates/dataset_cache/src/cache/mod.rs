//! Cached dataset facade.
//!
//! [`CachedDataset`] materializes a lazily-computed dataset into an on-disk
//! archive under `<root>/cached/` and serves examples from it. Construction
//! is build-if-absent: when a complete archive already exists it is opened
//! directly and the parallel build pass is skipped entirely.

mod build;
pub mod config;

pub use config::CacheConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::dataset::Dataset;
use crate::error::{CacheError, Result};
use crate::naming::KeyTemplate;

use build::run_build;

/// Subdirectory of the dataset root holding cache files.
const STORE_SUBDIR: &str = "cached";

/// Extension of the archive file.
const ARCHIVE_EXT: &str = "cache";

/// A persistent, randomly-accessible cache over a source dataset.
///
/// The first construction for a given `<root>/<name>` pair runs a parallel
/// build pass that pulls every example from the source, serializes it, and
/// stores it compressed in a single archive, with the dataset's labels in a
/// sibling file. Later constructions find the archive and open it read-only.
///
/// The archive is written to a temporary path and renamed into place only
/// after it is complete, so its presence at the final path is a reliable
/// completion marker: a build interrupted by a crash leaves nothing a later
/// construction would mistake for a valid cache.
#[derive(Debug)]
pub struct CachedDataset<D: Dataset> {
    dataset: Arc<D>,
    archive: ArchiveReader,
    naming: KeyTemplate,
    store_path: PathBuf,
    label_path: PathBuf,
}

impl<D: Dataset + 'static> CachedDataset<D> {
    /// Wraps `dataset` in its on-disk cache, building the cache first if it
    /// is absent (or unconditionally when `force_cache` is set).
    ///
    /// An existing archive that fails to open is reported as
    /// [`CacheError::CorruptArchive`] rather than silently rebuilt;
    /// overwriting it requires `force_cache`.
    pub fn new(dataset: D, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let dataset = Arc::new(dataset);

        let store_dir = dataset.root().join(STORE_SUBDIR);
        let store_path = store_dir.join(format!("{}.{ARCHIVE_EXT}", dataset.name()));
        let label_path = store_dir.join(format!("{}_labels.bin", dataset.name()));
        let naming = KeyTemplate::new(dataset.len());

        fs::create_dir_all(&store_dir).map_err(|e| CacheError::io(&store_dir, e))?;

        if config.force_cache || !store_path.exists() {
            build_cache(&dataset, &naming, &store_path, &label_path, &config)?;
        }

        let archive = ArchiveReader::open(&store_path)?;
        if archive.len() != dataset.len() {
            warn!(
                archive_entries = archive.len(),
                dataset_len = dataset.len(),
                "cached archive entry count differs from source dataset; \
                 reads past the archive will fail until rebuilt with force_cache"
            );
        }

        Ok(Self {
            dataset,
            archive,
            naming,
            store_path,
            label_path,
        })
    }

    /// Number of examples, delegated to the source dataset.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Checks if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Reads and deserializes the cached example at `index`.
    ///
    /// Fails with [`CacheError::IndexOutOfRange`] outside `[0, len)` and with
    /// [`CacheError::EntryNotFound`] if an in-bounds key is absent from the
    /// archive, which means the cache no longer matches its source.
    pub fn get_example(&self, index: usize) -> Result<D::Example> {
        let len = self.len();
        if index >= len {
            return Err(CacheError::IndexOutOfRange { index, len });
        }

        let key = self.naming.key(index);
        let bytes = self.archive.read_entry(&key)?;
        bincode::deserialize(&bytes)
            .map_err(|e| CacheError::serialization(format!("entry '{key}': {e}")))
    }

    /// Loads the label collection persisted at build time.
    ///
    /// Reflects the stored value, not a live recomputation; reloaded from
    /// disk on each call.
    pub fn labels(&self) -> Result<D::Labels> {
        let bytes = fs::read(&self.label_path).map_err(|e| CacheError::io(&self.label_path, e))?;
        bincode::deserialize(&bytes)
            .map_err(|e| CacheError::serialization(format!("labels: {e}")))
    }

    /// The source dataset this cache was built from.
    pub fn source(&self) -> &D {
        &self.dataset
    }

    /// Path of the archive file.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Path of the labels sibling file.
    pub fn label_path(&self) -> &Path {
        &self.label_path
    }
}

/// A cache serves the same examples as its source, so it is itself a
/// [`Dataset`] and composes with anything that consumes one.
impl<D: Dataset + 'static> Dataset for CachedDataset<D> {
    type Example = D::Example;
    type Labels = D::Labels;

    fn len(&self) -> usize {
        self.dataset.len()
    }

    fn root(&self) -> &Path {
        self.dataset.root()
    }

    fn name(&self) -> &str {
        self.dataset.name()
    }

    fn get_example(&self, index: usize) -> anyhow::Result<Self::Example> {
        Ok(CachedDataset::get_example(self, index)?)
    }

    fn labels(&self) -> anyhow::Result<Self::Labels> {
        Ok(CachedDataset::labels(self)?)
    }
}

/// Runs one full build pass into a temporary path, then renames the archive
/// into place as the final, atomic step.
///
/// On any failure the temporary file is removed, so nothing is left that a
/// later `CheckExisting` would treat as a valid cache. Under `force_cache` a
/// failed build also leaves the previous archive untouched.
fn build_cache<D: Dataset + 'static>(
    dataset: &Arc<D>,
    naming: &KeyTemplate,
    store_path: &Path,
    label_path: &Path,
    config: &CacheConfig,
) -> Result<()> {
    let tmp_path = temp_path(store_path);
    // A leftover temp file means an earlier build crashed partway through.
    let _ = fs::remove_file(&tmp_path);

    let built = write_archive(dataset, naming, &tmp_path, label_path, config)
        .and_then(|()| fs::rename(&tmp_path, store_path).map_err(|e| CacheError::io(store_path, e)));

    if let Err(e) = built {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

fn write_archive<D: Dataset + 'static>(
    dataset: &Arc<D>,
    naming: &KeyTemplate,
    tmp_path: &Path,
    label_path: &Path,
    config: &CacheConfig,
) -> Result<()> {
    let mut writer = ArchiveWriter::create(tmp_path)?;
    run_build(
        dataset,
        &mut writer,
        naming,
        config.num_workers,
        config.channel_capacity,
    )?;
    writer.finish()?;

    // Labels land before the rename so the archive's presence implies a
    // complete cache, labels included.
    write_labels(dataset.as_ref(), label_path)
}

fn write_labels<D: Dataset>(dataset: &D, label_path: &Path) -> Result<()> {
    let labels = dataset
        .labels()
        .map_err(|e| CacheError::build(format!("labels failed: {e:#}")))?;
    let bytes = bincode::serialize(&labels)
        .map_err(|e| CacheError::serialization(format!("labels: {e}")))?;
    fs::write(label_path, bytes).map_err(|e| CacheError::io(label_path, e))
}

fn temp_path(store_path: &Path) -> PathBuf {
    let file_name = store_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ARCHIVE_EXT.to_string());
    store_path.with_file_name(format!(".{file_name}.tmp"))
}
