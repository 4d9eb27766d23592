//! Archive-level operations: create / list / extract / append / delete / concatenate.
//!
//! Each operation opens the archive (or archives) afresh and writes any
//! result to a sibling `<archive>.tmp` file, renaming it over the
//! destination only once the whole write has succeeded. No handle from one
//! operation is ever reused by another.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::format::{ArchiveHeader, FileEntry, FormatError};
use crate::hamming::{HammingCodec, HammingError, HammingOptions};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("input path does not exist or is not a regular file: {0}")]
    InputNotFound(PathBuf),
    #[error("no such entry in archive: {0}")]
    NameNotFound(String),
    #[error("duplicate entry name: {0}")]
    DuplicateName(String),
    #[error("no files were deleted")]
    NothingToDelete,
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Hamming(#[from] HammingError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One listed entry, name rendered lossily for display.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: Vec<u8>,
    pub original_size: u64,
    pub encoded_size: u64,
}

impl FileInfo {
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

impl From<&FileEntry> for FileInfo {
    fn from(e: &FileEntry) -> Self {
        FileInfo { name: e.name.clone(), original_size: e.original_size, encoded_size: e.encoded_size }
    }
}

fn basename_bytes(path: &Path) -> Vec<u8> {
    path.file_name().map(OsStr::as_bytes).unwrap_or_default().to_vec()
}

fn tmp_path_for(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Copy exactly `len` bytes from `src` at its current position into `dst`.
fn copy_exact<R: Read, W: Write>(src: &mut R, dst: &mut W, len: u64) -> io::Result<()> {
    let mut remaining = len;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        src.read_exact(&mut buf[..chunk])?;
        dst.write_all(&buf[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}

/// Remove a staging file, ignoring a "doesn't exist" failure.
fn remove_tmp(tmp: &Path) {
    let _ = fs::remove_file(tmp);
}

fn check_unique_names(entries: &[FileEntry]) -> Result<(), ArchiveError> {
    let mut seen = std::collections::HashSet::new();
    for e in entries {
        if !seen.insert(&e.name) {
            return Err(ArchiveError::DuplicateName(String::from_utf8_lossy(&e.name).into_owned()));
        }
    }
    Ok(())
}

// ── Create ──────────────────────────────────────────────────────────────────

pub fn create(archive_path: &Path, options: HammingOptions, inputs: &[PathBuf]) -> Result<(), ArchiveError> {
    if inputs.is_empty() {
        return Err(ArchiveError::InvalidArguments("at least one input file is required".into()));
    }
    for input in inputs {
        if !input.is_file() {
            return Err(ArchiveError::InputNotFound(input.clone()));
        }
    }

    let codec = HammingCodec::new(options);
    let mut entries = Vec::with_capacity(inputs.len());
    for input in inputs {
        let original_size = fs::metadata(input)?.len();
        entries.push(FileEntry {
            name: basename_bytes(input),
            original_size,
            encoded_size: codec.encoded_size(original_size),
            offset: 0,
        });
    }
    check_unique_names(&entries)?;

    let mut header = ArchiveHeader { entries };
    header.assign_offsets();

    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    match write_archive(archive_path, &header, inputs, &codec) {
        Ok(()) => Ok(()),
        Err(e) => {
            remove_tmp(archive_path);
            Err(e)
        }
    }
}

/// Write `header` followed by each input's encoded payload directly to
/// `archive_path`, truncating it.
fn write_archive(
    archive_path: &Path,
    header: &ArchiveHeader,
    inputs: &[PathBuf],
    codec: &HammingCodec,
) -> Result<(), ArchiveError> {
    let mut out = File::create(archive_path)?;
    header.write(&mut out)?;
    for input in inputs {
        let reader = File::open(input)?;
        codec.encode_stream(reader, &mut out)?;
    }
    Ok(())
}

// ── List ────────────────────────────────────────────────────────────────────

pub fn list(archive_path: &Path) -> Result<Vec<FileInfo>, ArchiveError> {
    let mut f = File::open(archive_path)?;
    let header = ArchiveHeader::read(&mut f)?;
    Ok(header.entries.iter().map(FileInfo::from).collect())
}

// ── Extract ─────────────────────────────────────────────────────────────────

pub fn extract(archive_path: &Path, options: HammingOptions, names: &[Vec<u8>]) -> Result<(), ArchiveError> {
    let mut f = File::open(archive_path)?;
    let header = ArchiveHeader::read(&mut f)?;
    let codec = HammingCodec::new(options);

    let selected: Vec<&FileEntry> = if names.is_empty() {
        header.entries.iter().collect()
    } else {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let entry = header
                .entries
                .iter()
                .find(|e| &e.name == name)
                .ok_or_else(|| ArchiveError::NameNotFound(String::from_utf8_lossy(name).into_owned()))?;
            out.push(entry);
        }
        out
    };

    for entry in selected {
        f.seek(SeekFrom::Start(entry.offset))?;
        let out_path = PathBuf::from(OsStr::from_bytes(&entry.name));
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut out_file = File::create(&out_path)?;
        let bounded = (&mut f).take(entry.encoded_size);
        codec.decode_stream(bounded, &mut out_file, entry.original_size)?;
    }

    Ok(())
}

// ── Append ──────────────────────────────────────────────────────────────────

pub fn append(archive_path: &Path, options: HammingOptions, inputs: &[PathBuf]) -> Result<(), ArchiveError> {
    if inputs.is_empty() {
        return Err(ArchiveError::InvalidArguments("at least one input file is required".into()));
    }
    for input in inputs {
        if !input.is_file() {
            return Err(ArchiveError::InputNotFound(input.clone()));
        }
    }

    let mut src = File::open(archive_path)?;
    let old_header = ArchiveHeader::read(&mut src)?;
    let old_offsets: Vec<u64> = old_header.entries.iter().map(|e| e.offset).collect();

    let codec = HammingCodec::new(options);
    let mut new_entries = Vec::with_capacity(inputs.len());
    for input in inputs {
        let original_size = fs::metadata(input)?.len();
        new_entries.push(FileEntry {
            name: basename_bytes(input),
            original_size,
            encoded_size: codec.encoded_size(original_size),
            offset: 0,
        });
    }

    let mut combined = old_header.entries;
    combined.extend(new_entries);
    check_unique_names(&combined)?;

    let mut header = ArchiveHeader { entries: combined };
    header.assign_offsets();

    let tmp = tmp_path_for(archive_path);
    let result = (|| -> Result<(), ArchiveError> {
        let mut out = File::create(&tmp)?;
        header.write(&mut out)?;

        let old_count = old_offsets.len();
        for (i, entry) in header.entries.iter().enumerate() {
            if i < old_count {
                src.seek(SeekFrom::Start(old_offsets[i]))?;
                copy_exact(&mut src, &mut out, entry.encoded_size)?;
            } else {
                let input = &inputs[i - old_count];
                let reader = File::open(input)?;
                codec.encode_stream(reader, &mut out)?;
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&tmp, archive_path)?;
            Ok(())
        }
        Err(e) => {
            remove_tmp(&tmp);
            Err(e)
        }
    }
}

// ── Delete ──────────────────────────────────────────────────────────────────

pub fn delete(archive_path: &Path, names: &[Vec<u8>]) -> Result<(), ArchiveError> {
    let mut src = File::open(archive_path)?;
    let old_header = ArchiveHeader::read(&mut src)?;

    for name in names {
        if !old_header.entries.iter().any(|e| &e.name == name) {
            return Err(ArchiveError::NameNotFound(String::from_utf8_lossy(name).into_owned()));
        }
    }

    let keep: Vec<FileEntry> = old_header
        .entries
        .iter()
        .filter(|e| !names.iter().any(|n| n == &e.name))
        .cloned()
        .collect();

    if keep.len() == old_header.entries.len() {
        return Err(ArchiveError::NothingToDelete);
    }

    let old_offsets: Vec<u64> = keep.iter().map(|e| e.offset).collect();

    let mut header = ArchiveHeader { entries: keep };
    header.assign_offsets();

    let tmp = tmp_path_for(archive_path);
    let result = (|| -> Result<(), ArchiveError> {
        let mut out = File::create(&tmp)?;
        header.write(&mut out)?;
        for (entry, &old_offset) in header.entries.iter().zip(old_offsets.iter()) {
            src.seek(SeekFrom::Start(old_offset))?;
            copy_exact(&mut src, &mut out, entry.encoded_size)?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&tmp, archive_path)?;
            Ok(())
        }
        Err(e) => {
            remove_tmp(&tmp);
            Err(e)
        }
    }
}

// ── Concatenate ─────────────────────────────────────────────────────────────

pub fn concatenate(target_path: &Path, sources: &[PathBuf]) -> Result<(), ArchiveError> {
    if sources.len() < 2 {
        return Err(ArchiveError::InvalidArguments("concatenate requires at least two source archives".into()));
    }

    struct SourceSpan {
        data_start: u64,
        data_length: u64,
    }

    let mut used_names: std::collections::HashSet<Vec<u8>> = std::collections::HashSet::new();
    let mut combined: Vec<FileEntry> = Vec::new();
    let mut spans: Vec<SourceSpan> = Vec::with_capacity(sources.len());

    for source in sources {
        let mut f = File::open(source)?;
        let header = ArchiveHeader::read(&mut f)?;
        let data_start = header.header_size();
        let data_length = fs::metadata(source)?.len().saturating_sub(data_start);
        spans.push(SourceSpan { data_start, data_length });

        for entry in &header.entries {
            let mut name = entry.name.clone();
            if !used_names.insert(name.clone()) {
                let mut suffix = 2u32;
                loop {
                    let mut candidate = entry.name.clone();
                    candidate.extend_from_slice(format!("({suffix})").as_bytes());
                    if used_names.insert(candidate.clone()) {
                        name = candidate;
                        break;
                    }
                    suffix += 1;
                }
            }
            combined.push(FileEntry {
                name,
                original_size: entry.original_size,
                encoded_size: entry.encoded_size,
                offset: 0,
            });
        }
    }

    let mut header = ArchiveHeader { entries: combined };
    header.assign_offsets();

    if let Some(parent) = target_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path_for(target_path);
    let result = (|| -> Result<(), ArchiveError> {
        let mut out = File::create(&tmp)?;
        header.write(&mut out)?;
        for (source, span) in sources.iter().zip(spans.iter()) {
            let mut f = File::open(source)?;
            f.seek(SeekFrom::Start(span.data_start))?;
            copy_exact(&mut f, &mut out, span.data_length)?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&tmp, target_path)?;
            Ok(())
        }
        Err(e) => {
            remove_tmp(&tmp);
            Err(e)
        }
    }
}
