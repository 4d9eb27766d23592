//! # haf — Hamming Archive Format
//!
//! Format guarantees:
//! - All numeric fields are little-endian; never negotiated
//! - The archive header is exactly magic + file count + per-file records —
//!   no CRC, no version field, no content hash
//! - Per-file payload is protected by a parametric Hamming
//!   single-error-correcting code; isolated single-bit corruption is
//!   silently repaired on extract, multi-bit corruption in one codeword
//!   is reported as an error
//! - Entries carry basenames only: no path components, no filesystem
//!   metadata
//! - Archives are created or rebuilt whole; mutation always stages into
//!   `<archive>.tmp` and renames over the destination on success

pub mod archive;
pub mod bitstream;
pub mod format;
pub mod hamming;

pub use archive::{append, concatenate, create, delete, extract, list, ArchiveError, FileInfo};
pub use bitstream::{BitReader, BitWriter};
pub use format::{ArchiveHeader, FileEntry, FormatError, MAGIC};
pub use hamming::{HammingCodec, HammingError, HammingOptions};
