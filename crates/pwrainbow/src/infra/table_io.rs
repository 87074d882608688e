//! Table file I/O operations
//!
//! This module provides functions for reading and writing binary rainbow
//! table files, plus extension-based dispatch between the binary and CSV
//! encodings.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::constants::FILE_HEADER_SIZE;
use crate::domain::chain::ChainEntry;
use crate::domain::hash::Digest;
use crate::domain::params::TableParams;
use crate::domain::table::RainbowTable;
use crate::domain::table_format::{
    TableFormatError, TableHeader, ValidationOptions, check_file_size, validate_header,
};
use crate::infra::table_csv::{load_table_csv, save_table_csv};

#[cfg(feature = "mmap")]
use memmap2::Mmap;

pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    Ok(())
}

/// Save table to a binary file
pub fn save_table(path: impl AsRef<Path>, table: &RainbowTable) -> Result<(), TableFormatError> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let header = TableHeader::new(table.params(), table.target_entries(), table.len() as u64);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&header.to_bytes())?;
    for entry in table.entries() {
        writer.write_all(entry.start.as_bytes())?;
        writer.write_all(entry.end.as_bytes())?;
    }

    writer.flush()?;
    info!("saved {} entries to {}", table.len(), path.display());
    Ok(())
}

/// Read the header (fixed part and alphabet block) from a reader
fn read_header(reader: &mut impl Read) -> Result<TableHeader, TableFormatError> {
    let mut fixed = [0u8; FILE_HEADER_SIZE];
    read_exact_or_truncated(reader, &mut fixed, 0)?;

    let alphabet_len = TableHeader::alphabet_len(&fixed);
    let mut buf = Vec::with_capacity(FILE_HEADER_SIZE + alphabet_len);
    buf.extend_from_slice(&fixed);
    buf.resize(FILE_HEADER_SIZE + alphabet_len, 0);
    read_exact_or_truncated(reader, &mut buf[FILE_HEADER_SIZE..], FILE_HEADER_SIZE as u64)?;

    TableHeader::from_bytes(&buf)
}

fn read_exact_or_truncated(
    reader: &mut impl Read,
    buf: &mut [u8],
    offset: u64,
) -> Result<(), TableFormatError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => {
                return Err(TableFormatError::Truncated {
                    expected: offset + buf.len() as u64,
                    found: offset + filled as u64,
                });
            }
            n => filled += n,
        }
    }
    Ok(())
}

/// Load only the header of a binary table file
pub fn load_header(path: impl AsRef<Path>) -> Result<TableHeader, TableFormatError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_header(&mut reader)
}

fn decode_entry(params: &TableParams, bytes: &[u8]) -> Result<ChainEntry, TableFormatError> {
    let password_len = params.keyspace().password_len();
    let start = params.keyspace().password_from_bytes(&bytes[..password_len])?;
    let end = Digest::from_slice(&bytes[password_len..])?;
    Ok(ChainEntry::new(start, end))
}

/// Load table from a binary file with validation
///
/// The header is checked against `options`, the file size against the header,
/// and every entry is decoded into the key space the header describes.
pub fn load_table(
    path: impl AsRef<Path>,
    options: &ValidationOptions,
) -> Result<RainbowTable, TableFormatError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let metadata = file.metadata()?;

    let mut reader = BufReader::new(file);
    let header = read_header(&mut reader)?;
    validate_header(&header, options)?;

    check_file_size(&header, metadata.len())?;

    let params = header.params()?;
    let mut entries = Vec::with_capacity(header.actual_entries as usize);
    let mut buf = vec![0u8; header.entry_size()];
    for _ in 0..header.actual_entries {
        reader.read_exact(&mut buf)?;
        entries.push(decode_entry(&params, &buf)?);
    }

    debug!("loaded {} entries from {}", entries.len(), path.display());
    RainbowTable::from_entries(params, header.target_entries, entries)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Save a table as CSV when the path ends in `.csv`, binary otherwise
pub fn save_any_table(path: impl AsRef<Path>, table: &RainbowTable) -> Result<(), TableFormatError> {
    let path = path.as_ref();
    if is_csv(path) {
        save_table_csv(path, table)
    } else {
        save_table(path, table)
    }
}

/// Load a table as CSV when the path ends in `.csv`, binary otherwise
pub fn load_any_table(
    path: impl AsRef<Path>,
    options: &ValidationOptions,
) -> Result<RainbowTable, TableFormatError> {
    let path = path.as_ref();
    if is_csv(path) {
        load_table_csv(path, options)
    } else {
        load_table(path, options)
    }
}

// =============================================================================
// Memory-mapped table I/O (mmap feature)
// =============================================================================

/// Memory-mapped binary rainbow table
///
/// Entries are decoded on access, so the file is never copied into memory as
/// a whole. `to_table` builds the searchable endpoint index.
#[cfg(feature = "mmap")]
pub struct MappedTable {
    mmap: Mmap,
    header: TableHeader,
    params: TableParams,
}

#[cfg(feature = "mmap")]
impl MappedTable {
    /// Open a binary table file as memory-mapped
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be mapped, its header is invalid or
    /// rejected by `options`, or its size disagrees with the header.
    pub fn open(
        path: impl AsRef<Path>,
        options: &ValidationOptions,
    ) -> Result<Self, TableFormatError> {
        let file = File::open(path)?;

        // SAFETY: the mapping is read-only and table files are not modified
        // while a search holds them open.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = TableHeader::from_bytes(&mmap)?;
        validate_header(&header, options)?;

        check_file_size(&header, mmap.len() as u64)?;

        let params = header.params()?;
        Ok(Self {
            mmap,
            header,
            params,
        })
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.header.actual_entries as usize
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get an entry by index
    ///
    /// Returns `None` if the index is out of bounds or the entry is not valid
    /// for the table's key space.
    pub fn get(&self, index: usize) -> Option<ChainEntry> {
        if index >= self.len() {
            return None;
        }

        let size = self.header.entry_size();
        let offset = self.header.encoded_len() + index * size;
        decode_entry(&self.params, &self.mmap[offset..offset + size]).ok()
    }

    /// Return an iterator over entries
    pub fn iter(&self) -> impl Iterator<Item = ChainEntry> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Build the searchable table from the mapped entries
    pub fn to_table(&self) -> Result<RainbowTable, TableFormatError> {
        let size = self.header.entry_size();
        let data = &self.mmap[self.header.encoded_len()..];
        let entries = data
            .chunks_exact(size)
            .map(|bytes| decode_entry(&self.params, bytes))
            .collect::<Result<Vec<_>, _>>()?;
        RainbowTable::from_entries(self.params.clone(), self.header.target_entries, entries)
    }
}
