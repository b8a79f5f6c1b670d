//! Persistent random-access archive of named, compressed byte blobs.
//!
//! An archive is written append-only by exactly one writer during a cache
//! build, finalized once, and read-only afterwards. See [`format`] for the
//! on-disk layout.

pub mod format;
pub mod reader;
pub mod writer;

pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;
