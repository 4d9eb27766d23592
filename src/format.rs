//! Archive header layout: magic, file count, and a fixed-field entry table.
//!
//! ```text
//! "HAF"            3 bytes
//! file_count       u32 LE
//! entry[0..count]:
//!   name_len       u16 LE
//!   name           name_len bytes, raw (no charset validation)
//!   original_size  u64 LE
//!   encoded_size   u64 LE
//!   offset         u64 LE
//! ```
//!
//! No CRC, no version field, no content hash — the Hamming code carried in
//! the payload is this format's only error-correction layer.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

pub const MAGIC: &[u8; 3] = b"HAF";

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("bad magic bytes: expected {MAGIC:?}, found {found:?}")]
    BadMagic { found: [u8; 3] },
    #[error("entry name length {len} exceeds remaining header bytes")]
    NameTooLong { len: u16 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Raw filename bytes, exactly as given on the command line's basename.
    /// Not validated against any charset, per the format's stated scope.
    pub name: Vec<u8>,
    pub original_size: u64,
    pub encoded_size: u64,
    /// Byte offset of this entry's payload within the archive file.
    pub offset: u64,
}

impl FileEntry {
    /// Bytes this entry occupies in the serialized header.
    fn serialized_len(&self) -> u64 {
        2 + self.name.len() as u64 + 8 + 8 + 8
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveHeader {
    pub entries: Vec<FileEntry>,
}

impl ArchiveHeader {
    /// Total header size in bytes: magic + count + every entry's fields.
    pub fn header_size(&self) -> u64 {
        let mut size = 3 + 4u64;
        for entry in &self.entries {
            size += entry.serialized_len();
        }
        size
    }

    /// Recompute every entry's `offset` so payloads sit back-to-back,
    /// immediately after the header, in entry order.
    pub fn assign_offsets(&mut self) {
        let mut offset = self.header_size();
        for entry in &mut self.entries {
            entry.offset = offset;
            offset += entry.encoded_size;
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), FormatError> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(self.entries.len() as u32)?;
        for entry in &self.entries {
            writer.write_u16::<LittleEndian>(entry.name.len() as u16)?;
            writer.write_all(&entry.name)?;
            writer.write_u64::<LittleEndian>(entry.original_size)?;
            writer.write_u64::<LittleEndian>(entry.encoded_size)?;
            writer.write_u64::<LittleEndian>(entry.offset)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, FormatError> {
        let mut magic = [0u8; 3];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FormatError::BadMagic { found: magic });
        }

        let count = reader.read_u32::<LittleEndian>()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_len = reader.read_u16::<LittleEndian>()?;
            let mut name = vec![0u8; name_len as usize];
            reader.read_exact(&mut name).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    FormatError::NameTooLong { len: name_len }
                } else {
                    FormatError::Io(e)
                }
            })?;
            let original_size = reader.read_u64::<LittleEndian>()?;
            let encoded_size = reader.read_u64::<LittleEndian>()?;
            let offset = reader.read_u64::<LittleEndian>()?;
            entries.push(FileEntry { name, original_size, encoded_size, offset });
        }
        Ok(ArchiveHeader { entries })
    }
}
