//! Append-only archive writer.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::format::{IndexEntry, HEADER_LEN, MAGIC, VERSION};
use crate::error::{CacheError, Result};

/// Single-owner writer that appends compressed entries and finalizes the
/// index.
///
/// The file is not a valid archive until [`finish`](ArchiveWriter::finish)
/// succeeds; dropping the writer early leaves a file without a footer, which
/// readers reject.
pub struct ArchiveWriter {
    path: PathBuf,
    file: BufWriter<File>,
    index: Vec<IndexEntry>,
    keys: HashSet<String>,
    offset: u64,
}

impl ArchiveWriter {
    /// Creates (or truncates) the archive file and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| CacheError::io(path, e))?;
        let mut file = BufWriter::new(file);

        file.write_all(&MAGIC).map_err(|e| CacheError::io(path, e))?;
        file.write_all(&VERSION.to_le_bytes())
            .map_err(|e| CacheError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            index: Vec::new(),
            keys: HashSet::new(),
            offset: HEADER_LEN,
        })
    }

    /// Compresses and appends one named entry.
    ///
    /// Duplicate keys are rejected: the build protocol produces each index
    /// exactly once, so a duplicate means that invariant broke upstream.
    pub fn write_entry(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        if !self.keys.insert(key.to_string()) {
            return Err(CacheError::build(format!("duplicate archive key '{key}'")));
        }

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(bytes)
            .map_err(|e| CacheError::io(&self.path, e))?;
        let compressed = encoder.finish().map_err(|e| CacheError::io(&self.path, e))?;

        self.file
            .write_all(&compressed)
            .map_err(|e| CacheError::io(&self.path, e))?;

        self.index.push(IndexEntry {
            key: key.to_string(),
            offset: self.offset,
            compressed_len: compressed.len() as u64,
            uncompressed_len: bytes.len() as u64,
        });
        self.offset += compressed.len() as u64;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Checks if no entries have been written yet.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Writes the index and footer, then flushes and syncs the file.
    ///
    /// Only after this returns is the file a readable archive.
    pub fn finish(mut self) -> Result<()> {
        let index_bytes = bincode::serialize(&self.index)
            .map_err(|e| CacheError::serialization(format!("archive index: {e}")))?;

        self.file
            .write_all(&index_bytes)
            .and_then(|()| self.file.write_all(&(index_bytes.len() as u64).to_le_bytes()))
            .and_then(|()| self.file.write_all(&MAGIC))
            .map_err(|e| CacheError::io(&self.path, e))?;

        let file = self
            .file
            .into_inner()
            .map_err(|e| CacheError::io(&self.path, e.into_error()))?;
        file.sync_all().map_err(|e| CacheError::io(&self.path, e))?;
        Ok(())
    }
}
