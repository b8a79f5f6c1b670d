//! Random-access archive reader.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flate2::read::DeflateDecoder;

use super::format::{IndexEntry, FOOTER_LEN, HEADER_LEN, MAGIC, VERSION};
use crate::error::{CacheError, Result};

/// Read-only view of a finalized archive.
///
/// The index is loaded eagerly on open; entries are seeked and decompressed
/// on demand. The file handle sits behind a mutex so one open archive can be
/// shared across training threads.
#[derive(Debug)]
pub struct ArchiveReader {
    path: PathBuf,
    file: Mutex<File>,
    index: HashMap<String, IndexEntry>,
}

impl ArchiveReader {
    /// Opens an archive and validates its header, footer, and index.
    ///
    /// Fails with [`CacheError::CorruptArchive`] if the file is not a
    /// complete archive, including the truncated remains of an interrupted
    /// write.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| CacheError::io(path, e))?;
        let total = file
            .metadata()
            .map_err(|e| CacheError::io(path, e))?
            .len();

        if total < HEADER_LEN + FOOTER_LEN {
            return Err(CacheError::corrupt(path, "file too short to be an archive"));
        }

        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)
            .map_err(|e| CacheError::io(path, e))?;
        if header[..4] != MAGIC {
            return Err(CacheError::corrupt(path, "bad magic bytes"));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(CacheError::corrupt(
                path,
                format!("unsupported archive version {version}"),
            ));
        }

        let mut footer = [0u8; FOOTER_LEN as usize];
        file.seek(SeekFrom::End(-(FOOTER_LEN as i64)))
            .map_err(|e| CacheError::io(path, e))?;
        file.read_exact(&mut footer)
            .map_err(|e| CacheError::io(path, e))?;
        if footer[8..] != MAGIC {
            return Err(CacheError::corrupt(
                path,
                "bad footer magic; archive was not finalized",
            ));
        }

        let index_len = u64::from_le_bytes([
            footer[0], footer[1], footer[2], footer[3], footer[4], footer[5], footer[6], footer[7],
        ]);
        if index_len > total - HEADER_LEN - FOOTER_LEN {
            return Err(CacheError::corrupt(path, "index length exceeds file size"));
        }

        file.seek(SeekFrom::End(-((FOOTER_LEN + index_len) as i64)))
            .map_err(|e| CacheError::io(path, e))?;
        let mut index_bytes = vec![0u8; index_len as usize];
        file.read_exact(&mut index_bytes)
            .map_err(|e| CacheError::io(path, e))?;

        let entries: Vec<IndexEntry> = bincode::deserialize(&index_bytes)
            .map_err(|e| CacheError::corrupt(path, format!("unreadable index: {e}")))?;
        let index = entries.into_iter().map(|e| (e.key.clone(), e)).collect();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            index,
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Checks if the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Checks whether `key` names an entry.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Reads and decompresses the entry named `key`.
    pub fn read_entry(&self, key: &str) -> Result<Vec<u8>> {
        let entry = self.index.get(key).ok_or_else(|| CacheError::EntryNotFound {
            key: key.to_string(),
        })?;

        let mut compressed = vec![0u8; entry.compressed_len as usize];
        {
            // A poisoned lock still guards a usable file handle.
            let mut file = match self.file.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            file.seek(SeekFrom::Start(entry.offset))
                .map_err(|e| CacheError::io(&self.path, e))?;
            file.read_exact(&mut compressed).map_err(|e| {
                CacheError::corrupt(&self.path, format!("entry '{key}' unreadable: {e}"))
            })?;
        }

        let mut bytes = Vec::with_capacity(entry.uncompressed_len as usize);
        DeflateDecoder::new(compressed.as_slice())
            .read_to_end(&mut bytes)
            .map_err(|e| {
                CacheError::corrupt(&self.path, format!("entry '{key}' failed to decompress: {e}"))
            })?;

        if bytes.len() as u64 != entry.uncompressed_len {
            return Err(CacheError::corrupt(
                &self.path,
                format!(
                    "entry '{key}' decompressed to {} bytes, expected {}",
                    bytes.len(),
                    entry.uncompressed_len
                ),
            ));
        }
        Ok(bytes)
    }
}
