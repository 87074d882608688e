//! CSV table interchange format
//!
//! Layout:
//!
//! ```text
//! # Rainbow Table
//! # Chain Length (t),1000
//! # Target Entries (n),11813
//! # Actual Entries,11813
//! # Alphabet,abcdefghijklmnopqrstuvwxyz
//! # Password Length,5
//! # Hash Length (bits),40
//! # Space Size,11881376
//! # Coverage (%),99.4253
//! # Timestamp,1760000000
//!
//! initial_password,final_hash_hex
//! qwert,0a1b2c3d4e
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::{CSV_COLUMNS, FILE_FORMAT_VERSION};
use crate::domain::chain::ChainEntry;
use crate::domain::hash::Digest;
use crate::domain::table::RainbowTable;
use crate::domain::table_format::{
    TableFormatError, TableHeader, ValidationOptions, validate_header,
};
use crate::infra::table_io::ensure_parent_dir;

const TITLE: &str = "# Rainbow Table";
const KEY_CHAIN_LENGTH: &str = "Chain Length (t)";
const KEY_TARGET_ENTRIES: &str = "Target Entries (n)";
const KEY_ACTUAL_ENTRIES: &str = "Actual Entries";
const KEY_ALPHABET: &str = "Alphabet";
const KEY_PASSWORD_LENGTH: &str = "Password Length";
const KEY_HASH_BITS: &str = "Hash Length (bits)";
const KEY_SPACE_SIZE: &str = "Space Size";
const KEY_COVERAGE: &str = "Coverage (%)";
const KEY_TIMESTAMP: &str = "Timestamp";

/// One data row
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    initial_password: String,
    final_hash_hex: String,
}

/// Save table as CSV
pub fn save_table_csv(
    path: impl AsRef<Path>,
    table: &RainbowTable,
) -> Result<(), TableFormatError> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let header = TableHeader::new(table.params(), table.target_entries(), table.len() as u64);
    let mut out = BufWriter::new(File::create(path)?);

    {
        let mut meta = WriterBuilder::new().flexible(true).from_writer(&mut out);
        meta.write_record([TITLE])?;
        let rows = [
            (KEY_CHAIN_LENGTH, header.chain_length.to_string()),
            (KEY_TARGET_ENTRIES, header.target_entries.to_string()),
            (KEY_ACTUAL_ENTRIES, header.actual_entries.to_string()),
            (KEY_ALPHABET, header.alphabet.clone()),
            (KEY_PASSWORD_LENGTH, header.password_length.to_string()),
            (KEY_HASH_BITS, (header.digest_bytes * 8).to_string()),
            (KEY_SPACE_SIZE, header.keyspace_size.to_string()),
            (
                KEY_COVERAGE,
                format!("{:.4}", table.theoretical_coverage() * 100.0),
            ),
            (KEY_TIMESTAMP, header.created_at.to_string()),
        ];
        for (key, value) in rows {
            meta.write_record([format!("# {}", key), value])?;
        }
        meta.flush()?;
    }
    out.write_all(b"\n")?;

    {
        let mut data = WriterBuilder::new().has_headers(true).from_writer(&mut out);
        for entry in table.entries() {
            data.serialize(CsvRow {
                initial_password: entry.start.as_str().to_string(),
                final_hash_hex: entry.end.to_hex(),
            })?;
        }
        if table.is_empty() {
            data.write_record(CSV_COLUMNS)?;
        }
        data.flush()?;
    }
    out.flush()?;

    info!("saved {} entries to {}", table.len(), path.display());
    Ok(())
}

/// Metadata collected from `# key,value` rows
#[derive(Default)]
struct Metadata {
    chain_length: Option<u32>,
    target_entries: Option<u64>,
    actual_entries: Option<u64>,
    alphabet: Option<String>,
    password_length: Option<usize>,
    digest_bits: Option<usize>,
    keyspace_size: Option<u64>,
    created_at: u64,
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TableFormatError> {
    value
        .trim()
        .parse()
        .map_err(|_| TableFormatError::InvalidMetadata {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl Metadata {
    fn absorb(&mut self, record: &StringRecord) -> Result<(), TableFormatError> {
        let key = record
            .get(0)
            .unwrap_or_default()
            .trim_start_matches('#')
            .trim();
        let Some(value) = record.get(1) else {
            // Title and other value-less comment rows
            return Ok(());
        };

        match key {
            KEY_CHAIN_LENGTH => self.chain_length = Some(parse_value(key, value)?),
            KEY_TARGET_ENTRIES => self.target_entries = Some(parse_value(key, value)?),
            KEY_ACTUAL_ENTRIES => self.actual_entries = Some(parse_value(key, value)?),
            KEY_ALPHABET => self.alphabet = Some(value.to_string()),
            KEY_PASSWORD_LENGTH => self.password_length = Some(parse_value(key, value)?),
            KEY_HASH_BITS => self.digest_bits = Some(parse_value(key, value)?),
            KEY_SPACE_SIZE => self.keyspace_size = Some(parse_value(key, value)?),
            KEY_TIMESTAMP => self.created_at = value.trim().parse().unwrap_or(0),
            _ => debug!("ignoring metadata row {:?}", key),
        }
        Ok(())
    }

    fn into_header(self, rows: u64) -> Result<TableHeader, TableFormatError> {
        let chain_length = self
            .chain_length
            .ok_or(TableFormatError::MissingMetadata(KEY_CHAIN_LENGTH))?;
        let alphabet = self
            .alphabet
            .ok_or(TableFormatError::MissingMetadata(KEY_ALPHABET))?;
        let password_length = self
            .password_length
            .ok_or(TableFormatError::MissingMetadata(KEY_PASSWORD_LENGTH))?;
        let digest_bits = self
            .digest_bits
            .ok_or(TableFormatError::MissingMetadata(KEY_HASH_BITS))?;
        if digest_bits == 0 || digest_bits % 8 != 0 {
            return Err(TableFormatError::InvalidMetadata {
                key: KEY_HASH_BITS.to_string(),
                value: digest_bits.to_string(),
            });
        }

        let actual_entries = self.actual_entries.unwrap_or(rows);
        if actual_entries != rows {
            return Err(TableFormatError::EntryCountMismatch {
                expected: actual_entries,
                found: rows,
            });
        }
        let keyspace_size = match self.keyspace_size {
            Some(size) => size,
            None => crate::domain::keyspace::KeySpace::new(&alphabet, password_length)?.size(),
        };

        Ok(TableHeader {
            version: FILE_FORMAT_VERSION,
            chain_length,
            target_entries: self.target_entries.unwrap_or(actual_entries),
            actual_entries,
            alphabet,
            password_length,
            digest_bytes: digest_bits / 8,
            keyspace_size,
            created_at: self.created_at,
        })
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn is_column_header(record: &StringRecord) -> bool {
    record.len() == CSV_COLUMNS.len()
        && record
            .iter()
            .zip(CSV_COLUMNS)
            .all(|(field, column)| field.trim() == column)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Load table from CSV with validation
///
/// Metadata rows are read up to the `initial_password,final_hash_hex` column
/// header; every following row is one chain.
pub fn load_table_csv(
    path: impl AsRef<Path>,
    options: &ValidationOptions,
) -> Result<RainbowTable, TableFormatError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(File::open(path)?));

    let mut metadata = Metadata::default();
    let mut rows: Vec<(u64, CsvRow)> = Vec::new();
    let mut in_data = false;
    let columns = StringRecord::from(CSV_COLUMNS.to_vec());

    for record in reader.records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let line = line_of(&record);

        if !in_data {
            if is_column_header(&record) {
                in_data = true;
            } else if record.get(0).is_some_and(|f| f.trim_start().starts_with('#')) {
                metadata.absorb(&record)?;
            } else {
                return Err(TableFormatError::MalformedRow {
                    line,
                    reason: "data row before the column header".into(),
                });
            }
            continue;
        }

        let row: CsvRow = record
            .deserialize(Some(&columns))
            .map_err(|e| TableFormatError::MalformedRow {
                line,
                reason: e.to_string(),
            })?;
        rows.push((line, row));
    }

    if !in_data {
        return Err(TableFormatError::MissingMetadata("column header"));
    }

    let header = metadata.into_header(rows.len() as u64)?;
    validate_header(&header, options)?;
    let params = header.params()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let malformed = |e: crate::error::RainbowError| TableFormatError::MalformedRow {
            line,
            reason: e.to_string(),
        };
        let start = params
            .keyspace()
            .parse_password(row.initial_password.trim())
            .map_err(malformed)?;
        let end = Digest::from_hex(&row.final_hash_hex).map_err(malformed)?;
        entries.push(ChainEntry::new(start, end));
    }

    debug!("loaded {} entries from {}", entries.len(), path.display());
    RainbowTable::from_entries(params, header.target_entries, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::generator::{BuildOptions, generate_table};
    use crate::domain::params::TableParams;
    use std::fs;
    use tempfile::tempdir;

    fn table() -> RainbowTable {
        let params = TableParams::reference(25).unwrap();
        generate_table(&params, BuildOptions::new(15).with_seed(4)).table
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = table();

        save_table_csv(&path, &table).unwrap();
        let loaded = load_table_csv(&path, &ValidationOptions::for_params(table.params())).unwrap();

        assert_eq!(loaded.entries(), table.entries());
        assert_eq!(loaded.params(), table.params());
        assert_eq!(loaded.target_entries(), table.target_entries());
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = table();
        save_table_csv(&path, &table).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Rainbow Table");
        assert_eq!(lines[1], "# Chain Length (t),25");
        assert_eq!(lines[2], "# Target Entries (n),15");
        assert_eq!(lines[6], "# Hash Length (bits),40");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "initial_password,final_hash_hex");
        assert_eq!(lines.len(), 12 + 15);

        let first = &table.entries()[0];
        assert_eq!(lines[12], format!("{},{}", first.start, first.end.to_hex()));
    }

    #[test]
    fn test_csv_empty_table_keeps_column_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let params = TableParams::reference(25).unwrap();
        let empty = generate_table(&params, BuildOptions::new(0)).table;

        save_table_csv(&path, &empty).unwrap();
        let loaded = load_table_csv(&path, &ValidationOptions::permissive()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_csv_without_optional_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("minimal.csv");
        let params = TableParams::reference(3).unwrap();
        let start = params.keyspace().parse_password("hello").unwrap();
        let end = crate::domain::chain::compute_chain(&params, start).end;
        fs::write(
            &path,
            format!(
                "# Chain Length (t),3\n# Alphabet,abcdefghijklmnopqrstuvwxyz\n\
                 # Password Length,5\n# Hash Length (bits),40\n\n\
                 initial_password,final_hash_hex\nhello,{}\n",
                end.to_hex()
            ),
        )
        .unwrap();

        let loaded = load_table_csv(&path, &ValidationOptions::permissive()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.target_entries(), 1);
        assert_eq!(loaded.lookup(&end), Some(start));
    }

    #[test]
    fn test_csv_bad_hash_bits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.csv");
        fs::write(
            &path,
            "# Chain Length (t),3\n# Alphabet,ab\n# Password Length,2\n\
             # Hash Length (bits),12\n\ninitial_password,final_hash_hex\n",
        )
        .unwrap();

        assert!(matches!(
            load_table_csv(&path, &ValidationOptions::permissive()),
            Err(TableFormatError::InvalidMetadata { .. })
        ));
    }
}
