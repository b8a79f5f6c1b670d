//! The parallel cache-build pass.
//!
//! `num_workers` producer threads each take a contiguous index range, pull
//! examples from the shared dataset, serialize them, and send the resulting
//! `(key, bytes)` pairs into one bounded channel. The calling thread is the
//! single collector: it writes every entry into the archive and terminates
//! once it has observed exactly one completion sentinel per worker. Workers
//! never touch the archive.

use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info};

use crate::archive::ArchiveWriter;
use crate::dataset::Dataset;
use crate::error::{CacheError, Result};
use crate::naming::KeyTemplate;
use crate::partition::split_indices;

/// One message on the build channel.
///
/// Every worker sends any number of `Entry` messages followed by exactly one
/// `Done` sentinel carrying its outcome. A failing worker stops producing at
/// the failing index; its sentinel never implies success for it.
enum WorkerMessage {
    Entry { key: String, bytes: Vec<u8> },
    Done { worker_id: usize, outcome: Result<()> },
}

/// Runs the full producer/collector pass, filling `writer` with one entry
/// per dataset index.
///
/// On success the writer holds exactly `dataset.len()` entries. On any
/// worker failure the first error is returned and the caller discards the
/// partially-written archive.
pub(crate) fn run_build<D>(
    dataset: &Arc<D>,
    writer: &mut ArchiveWriter,
    naming: &KeyTemplate,
    num_workers: usize,
    channel_capacity: usize,
) -> Result<()>
where
    D: Dataset + 'static,
{
    let len = dataset.len();
    let started = Instant::now();
    info!(examples = len, workers = num_workers, "caching dataset");

    let (tx, rx) = bounded(channel_capacity);
    let ranges = split_indices(len, num_workers);

    let mut handles = Vec::with_capacity(num_workers);
    for (worker_id, range) in ranges.into_iter().enumerate() {
        match spawn_worker(worker_id, range, Arc::clone(dataset), naming.clone(), tx.clone()) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Tear down whatever already started before reporting.
                drop(tx);
                drop(rx);
                let _ = join_workers(handles, Ok(()));
                return Err(e);
            }
        }
    }
    // The collector must be the only remaining sender-free party; workers
    // hold the other clones.
    drop(tx);

    let collected = collect_entries(&rx, writer, num_workers);

    // Unblock any producer still waiting on a full channel before joining.
    drop(rx);
    join_workers(handles, collected)?;

    let written = writer.len();
    if written != len {
        return Err(CacheError::build(format!(
            "expected {len} entries, collected {written}"
        )));
    }

    info!(
        entries = written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dataset cached"
    );
    Ok(())
}

fn spawn_worker<D>(
    worker_id: usize,
    range: Range<usize>,
    dataset: Arc<D>,
    naming: KeyTemplate,
    tx: Sender<WorkerMessage>,
) -> Result<thread::JoinHandle<()>>
where
    D: Dataset + 'static,
{
    thread::Builder::new()
        .name(format!("cache-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker_id, start = range.start, end = range.end, "worker started");
            let outcome = produce_range(dataset.as_ref(), &naming, worker_id, range, &tx);
            // If the receiver is already gone the build has failed and no
            // one is listening for the sentinel.
            let _ = tx.send(WorkerMessage::Done { worker_id, outcome });
        })
        .map_err(|e| CacheError::build(format!("failed to spawn worker {worker_id}: {e}")))
}

/// Produces and sends every example in `range`. Empty ranges produce
/// nothing; the caller still sends the sentinel.
fn produce_range<D: Dataset>(
    dataset: &D,
    naming: &KeyTemplate,
    worker_id: usize,
    range: Range<usize>,
    tx: &Sender<WorkerMessage>,
) -> Result<()> {
    for index in range {
        let example = dataset.get_example(index).map_err(|e| {
            CacheError::build(format!("worker {worker_id}: get_example({index}) failed: {e:#}"))
        })?;
        let bytes = bincode::serialize(&example).map_err(|e| {
            CacheError::build(format!(
                "worker {worker_id}: example {index} failed to serialize: {e}"
            ))
        })?;

        let key = naming.key(index);
        if tx.send(WorkerMessage::Entry { key, bytes }).is_err() {
            return Err(CacheError::build(format!(
                "worker {worker_id}: output channel disconnected"
            )));
        }
    }
    Ok(())
}

/// Drains the channel until `num_workers` sentinels have been observed,
/// writing entries along the way.
///
/// After the first failure, remaining entries are discarded but sentinels
/// are still counted so every worker's completion is observed exactly once.
fn collect_entries(
    rx: &Receiver<WorkerMessage>,
    writer: &mut ArchiveWriter,
    num_workers: usize,
) -> Result<()> {
    let mut done_count = 0;
    let mut first_failure: Option<CacheError> = None;

    while done_count < num_workers {
        let message = rx.recv().map_err(|_| {
            CacheError::build("channel closed before all workers signalled completion")
        })?;

        match message {
            WorkerMessage::Entry { key, bytes } => {
                if first_failure.is_none() {
                    writer.write_entry(&key, &bytes)?;
                }
            }
            WorkerMessage::Done { worker_id, outcome } => {
                debug!(worker_id, ok = outcome.is_ok(), "worker finished");
                done_count += 1;
                if let Err(e) = outcome {
                    first_failure.get_or_insert(e);
                }
            }
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Joins all worker threads, folding a panic into the result if the build
/// had not already failed.
fn join_workers(handles: Vec<thread::JoinHandle<()>>, collected: Result<()>) -> Result<()> {
    let mut result = collected;
    for (worker_id, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() && result.is_ok() {
            result = Err(CacheError::build(format!("worker {worker_id} panicked")));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;
    use crate::dataset::InMemoryDataset;

    #[test]
    fn fills_writer_with_one_entry_per_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.cache");

        let dataset = Arc::new(InMemoryDataset::new(
            (0..10i64).collect(),
            dir.path(),
            "numbers",
        ));
        let naming = KeyTemplate::new(10);

        let mut writer = ArchiveWriter::create(&path).unwrap();
        run_build(&dataset, &mut writer, &naming, 3, 4).unwrap();
        writer.finish().unwrap();

        let reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(reader.len(), 10);
        for i in 0..10 {
            let bytes = reader.read_entry(&naming.key(i)).unwrap();
            let value: i64 = bincode::deserialize(&bytes).unwrap();
            assert_eq!(value, i as i64);
        }
    }

    #[test]
    fn empty_dataset_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.cache");

        let dataset = Arc::new(InMemoryDataset::<i64>::new(vec![], dir.path(), "empty"));
        let naming = KeyTemplate::new(0);

        let mut writer = ArchiveWriter::create(&path).unwrap();
        run_build(&dataset, &mut writer, &naming, 4, 4).unwrap();
        assert!(writer.is_empty());
    }
}
