use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use pwrainbow::constants::{FILE_FORMAT_VERSION, FILE_HEADER_SIZE, TABLE_MAGIC};
use pwrainbow::domain::chain::compute_chain;
use pwrainbow::domain::table_format::{TableFormatError, TableHeader, ValidationOptions};
use pwrainbow::infra::table_csv::load_table_csv;
use pwrainbow::infra::table_io::{load_header, load_table};
use pwrainbow::{ChainEntry, TableParams};
use tempfile::tempdir;

/// Write a binary table by hand, independent of `save_table`
fn write_binary(path: &Path, chain_length: u32, target: u64, entries: &[ChainEntry]) {
    let alphabet = b"abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::new();
    buf.extend_from_slice(&TABLE_MAGIC);
    buf.write_u16::<LittleEndian>(FILE_FORMAT_VERSION).unwrap();
    buf.push(5); // digest bytes
    buf.push(5); // password length
    buf.write_u32::<LittleEndian>(chain_length).unwrap();
    buf.write_u64::<LittleEndian>(target).unwrap();
    buf.write_u64::<LittleEndian>(entries.len() as u64).unwrap();
    buf.write_u64::<LittleEndian>(11_881_376).unwrap();
    buf.write_u64::<LittleEndian>(1_700_000_000).unwrap();
    buf.write_u16::<LittleEndian>(alphabet.len() as u16).unwrap();
    buf.resize(FILE_HEADER_SIZE, 0);
    buf.extend_from_slice(alphabet);
    for entry in entries {
        buf.extend_from_slice(entry.start.as_bytes());
        buf.extend_from_slice(entry.end.as_bytes());
    }
    fs::write(path, buf).unwrap();
}

fn sample_entries(params: &TableParams) -> Vec<ChainEntry> {
    ["hello", "world", "crypt"]
        .iter()
        .map(|text| compute_chain(params, params.keyspace().parse_password(text).unwrap()))
        .collect()
}

#[test]
fn test_hand_written_binary_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hand.bin");
    let params = TableParams::reference(40).unwrap();
    let entries = sample_entries(&params);
    write_binary(&path, 40, 3, &entries);

    let header = load_header(&path).unwrap();
    assert_eq!(header.chain_length, 40);
    assert_eq!(header.created_at, 1_700_000_000);

    let table = load_table(&path, &ValidationOptions::for_params(&params)).unwrap();
    assert_eq!(table.entries(), entries.as_slice());
    assert!(table.is_complete());
    assert_eq!(table.lookup(&entries[1].end), Some(entries[1].start));
}

#[test]
fn test_header_roundtrip() {
    let params = TableParams::reference(1000).unwrap();
    let header = TableHeader::new(&params, 11_813, 11_700);
    let restored = TableHeader::from_bytes(&header.to_bytes()).unwrap();
    assert_eq!(header, restored);
}

#[test]
fn test_invalid_magic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("magic.bin");
    let mut bytes = vec![0u8; FILE_HEADER_SIZE];
    bytes[0..8].copy_from_slice(b"INVALID\x00");
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        load_table(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::InvalidMagic)
    ));
}

#[test]
fn test_truncated_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.bin");
    fs::write(&path, &TABLE_MAGIC).unwrap();

    assert!(matches!(
        load_table(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::Truncated {
            expected: 64,
            found: 8
        })
    ));
}

#[test]
fn test_truncated_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cut.bin");
    let params = TableParams::reference(40).unwrap();
    write_binary(&path, 40, 3, &sample_entries(&params));

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

    assert!(matches!(
        load_table(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::InvalidFileSize { .. })
    ));
}

/// Overwrite the stored entry count (bytes 24..32 of the header)
fn patch_entry_count(path: &Path, count: u64) {
    let mut bytes = fs::read(path).unwrap();
    bytes[24..32].copy_from_slice(&count.to_le_bytes());
    fs::write(path, bytes).unwrap();
}

#[test]
fn test_huge_entry_count_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("huge.bin");
    let params = TableParams::reference(40).unwrap();
    write_binary(&path, 40, 3, &sample_entries(&params));
    patch_entry_count(&path, u64::MAX / 4);

    assert!(matches!(
        load_table(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::InvalidFileSize { .. })
    ));
    assert_eq!(load_header(&path).unwrap().actual_entries, u64::MAX / 4);
}

#[cfg(feature = "mmap")]
#[test]
fn test_huge_entry_count_rejected_mapped() {
    use pwrainbow::infra::table_io::MappedTable;

    let dir = tempdir().unwrap();
    let path = dir.path().join("huge_mapped.bin");
    let params = TableParams::reference(40).unwrap();
    write_binary(&path, 40, 3, &sample_entries(&params));
    patch_entry_count(&path, u64::MAX);

    assert!(matches!(
        MappedTable::open(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::InvalidFileSize { .. })
    ));
}

#[test]
fn test_duplicate_endpoint_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dup.bin");
    let params = TableParams::reference(40).unwrap();
    let entries = sample_entries(&params);
    let forged = ChainEntry::new(entries[1].start, entries[0].end);
    write_binary(&path, 40, 2, &[entries[0], forged]);

    assert!(matches!(
        load_table(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::DuplicateEndpoint(_))
    ));
}

#[test]
fn test_foreign_password_bytes_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("foreign.bin");
    let params = TableParams::reference(40).unwrap();
    write_binary(&path, 40, 1, &sample_entries(&params)[..1]);

    let mut bytes = fs::read(&path).unwrap();
    let offset = FILE_HEADER_SIZE + 26;
    bytes[offset] = b'A';
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        load_table(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::Params(_))
    ));
}

#[test]
fn test_digest_width_mismatch_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("width.bin");
    let params = TableParams::reference(40).unwrap();
    write_binary(&path, 40, 3, &sample_entries(&params));

    let options = ValidationOptions {
        expected_digest_bytes: Some(6),
        ..ValidationOptions::default()
    };
    assert!(matches!(
        load_table(&path, &options),
        Err(TableFormatError::DigestWidthMismatch {
            expected: 6,
            found: 5
        })
    ));
}

// =============================================================================
// CSV
// =============================================================================

const CSV_METADATA: &str = "# Rainbow Table\n\
# Chain Length (t),40\n\
# Target Entries (n),2\n\
# Alphabet,abcdefghijklmnopqrstuvwxyz\n\
# Password Length,5\n\
# Hash Length (bits),40\n\
\n";

#[test]
fn test_csv_malformed_hex_reports_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hex.csv");
    fs::write(
        &path,
        format!("{}initial_password,final_hash_hex\nhello,zz00112233\n", CSV_METADATA),
    )
    .unwrap();

    match load_table_csv(&path, &ValidationOptions::permissive()) {
        Err(TableFormatError::MalformedRow { line, .. }) => assert_eq!(line, 9),
        other => panic!("expected MalformedRow, got {:?}", other),
    }
}

#[test]
fn test_csv_missing_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.csv");
    fs::write(
        &path,
        format!("{}initial_password,final_hash_hex\nhello\n", CSV_METADATA),
    )
    .unwrap();

    assert!(matches!(
        load_table_csv(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::MalformedRow { .. })
    ));
}

#[test]
fn test_csv_missing_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("meta.csv");
    fs::write(
        &path,
        "# Chain Length (t),40\n\ninitial_password,final_hash_hex\n",
    )
    .unwrap();

    assert!(matches!(
        load_table_csv(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::MissingMetadata(_))
    ));
}

#[test]
fn test_csv_entry_count_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("count.csv");
    let params = TableParams::reference(40).unwrap();
    let entry = sample_entries(&params)[0];
    fs::write(
        &path,
        format!(
            "# Actual Entries,2\n{}initial_password,final_hash_hex\n{},{}\n",
            CSV_METADATA,
            entry.start,
            entry.end.to_hex()
        ),
    )
    .unwrap();

    assert!(matches!(
        load_table_csv(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::EntryCountMismatch {
            expected: 2,
            found: 1
        })
    ));
}

#[test]
fn test_csv_data_before_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("order.csv");
    fs::write(&path, "hello,0011223344\n").unwrap();

    assert!(matches!(
        load_table_csv(&path, &ValidationOptions::permissive()),
        Err(TableFormatError::MalformedRow { line: 1, .. })
    ));
}
