//! Archive container format.
//!
//! The archive layout is:
//! ```text
//! +----------------------+
//! | magic b"DSC1"        |
//! | version u32 LE       |
//! +----------------------+
//! | entry 0 (DEFLATE)    |
//! | entry 1 (DEFLATE)    |
//! | ...                  |
//! +----------------------+
//! | index (bincode)      |  <- Vec<IndexEntry>
//! +----------------------+
//! | index length u64 LE  |
//! | magic b"DSC1"        |
//! +----------------------+
//! ```
//!
//! Entries are located through the index, so archive order carries no
//! meaning; lookups are by key. The trailing magic doubles as a completion
//! check: a truncated write cannot produce a valid footer.

use serde::{Deserialize, Serialize};

/// Magic bytes identifying an archive file, at both ends.
pub const MAGIC: [u8; 4] = *b"DSC1";

/// Current format version.
pub const VERSION: u32 = 1;

/// Bytes occupied by the leading magic and version.
pub const HEADER_LEN: u64 = 8;

/// Bytes occupied by the index length and trailing magic.
pub const FOOTER_LEN: u64 = 12;

/// Index record locating one named entry in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Entry key, unique within the archive.
    pub key: String,
    /// Byte offset of the compressed blob from the start of the file.
    pub offset: u64,
    /// Length of the compressed blob in bytes.
    pub compressed_len: u64,
    /// Length of the blob after decompression, for validation and buffer
    /// sizing.
    pub uncompressed_len: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_entry_serialization() {
        let entry = IndexEntry {
            key: "example_07.bin".to_string(),
            offset: 8,
            compressed_len: 21,
            uncompressed_len: 64,
        };

        let encoded = bincode::serialize(&entry).unwrap();
        let decoded: IndexEntry = bincode::deserialize(&encoded).unwrap();

        assert_eq!(decoded.key, entry.key);
        assert_eq!(decoded.offset, entry.offset);
        assert_eq!(decoded.compressed_len, entry.compressed_len);
        assert_eq!(decoded.uncompressed_len, entry.uncompressed_len);
    }
}
