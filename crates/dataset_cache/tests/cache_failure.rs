//! Failure-path tests: aborted builds, corrupt archives, bad reads.
//!
//! Tests cover:
//! - A failing worker aborting the whole build with nothing left on disk
//! - A panicking worker being detected instead of hanging the collector
//! - Recovery: a clean build after a failed one
//! - Corrupt archives surfacing on open instead of being rebuilt over
//! - Out-of-range and inconsistent-cache reads

mod common;
use common::CountingDataset;

use dataset_cache::{CacheConfig, CachedDataset, CacheError};

fn config(workers: usize) -> CacheConfig {
    CacheConfig::builder().num_workers(workers).build()
}

fn store_path(dir: &std::path::Path) -> std::path::PathBuf {
    dir.join("cached").join("numbers.cache")
}

#[test]
fn worker_failure_aborts_build() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = CountingDataset::new(dir.path(), 10).failing_at(7);

    let err = CachedDataset::new(dataset, config(3)).unwrap_err();
    match err {
        CacheError::Build { message } => {
            assert!(message.contains("synthetic failure at index 7"), "{message}");
        }
        other => panic!("expected Build error, got {other:?}"),
    }

    // No archive, and no temp leftovers that a rerun could trip over.
    assert!(!store_path(dir.path()).exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("cached"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".cache"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}

#[test]
fn failed_build_does_not_poison_the_next_one() {
    let dir = tempfile::tempdir().unwrap();

    let failing = CountingDataset::new(dir.path(), 10).failing_at(0);
    assert!(CachedDataset::new(failing, config(3)).is_err());

    // The rerun starts clean and must actually rebuild, not hit a partial file.
    let clean = CountingDataset::new(dir.path(), 10);
    let calls = clean.calls();
    let cached = CachedDataset::new(clean, config(3)).unwrap();
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 10);
    assert_eq!(cached.get_example(9).unwrap().value, 27);
}

#[test]
fn panicking_worker_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = CountingDataset::new(dir.path(), 10).panicking_at(3);

    let err = CachedDataset::new(dataset, config(2)).unwrap_err();
    assert!(matches!(err, CacheError::Build { .. }), "{err:?}");
    assert!(!store_path(dir.path()).exists());
}

#[test]
fn out_of_range_read_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cached = CachedDataset::new(CountingDataset::new(dir.path(), 5), config(2)).unwrap();

    let err = cached.get_example(5).unwrap_err();
    assert!(matches!(err, CacheError::IndexOutOfRange { index: 5, len: 5 }));

    let err = cached.get_example(usize::MAX).unwrap_err();
    assert!(matches!(err, CacheError::IndexOutOfRange { .. }));
}

#[test]
fn corrupt_archive_surfaces_instead_of_rebuilding() {
    let dir = tempfile::tempdir().unwrap();

    std::fs::create_dir_all(dir.path().join("cached")).unwrap();
    std::fs::write(
        store_path(dir.path()),
        b"garbage bytes where an archive should be",
    )
    .unwrap();

    // Not silently treated as a cache miss.
    let dataset = CountingDataset::new(dir.path(), 5);
    let calls = dataset.calls();
    let err = CachedDataset::new(dataset, config(2)).unwrap_err();
    assert!(matches!(err, CacheError::CorruptArchive { .. }), "{err:?}");
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    // An explicit force_cache is the overwrite path.
    let force = CacheConfig::builder().num_workers(2).force_cache(true).build();
    let cached = CachedDataset::new(CountingDataset::new(dir.path(), 5), force).unwrap();
    assert_eq!(cached.get_example(2).unwrap().value, 6);
}

#[test]
fn length_mismatch_read_reports_missing_entry() {
    let dir = tempfile::tempdir().unwrap();

    let cached = CachedDataset::new(CountingDataset::new(dir.path(), 8), config(2)).unwrap();
    drop(cached);

    // The source grew without a rebuild: in-bounds reads past the archive
    // must fail loudly, never return wrong data.
    let grown = CountingDataset::new(dir.path(), 9);
    let cached = CachedDataset::new(grown, config(2)).unwrap();
    assert_eq!(cached.get_example(7).unwrap().value, 21);

    let err = cached.get_example(8).unwrap_err();
    assert!(matches!(err, CacheError::EntryNotFound { .. }), "{err:?}");
}
