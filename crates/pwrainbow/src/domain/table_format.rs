//! Rainbow table file format definitions
//!
//! This module defines the table metadata shared by the binary and CSV
//! encodings, the binary header layout, and header validation.
//!
//! Binary header layout (little-endian, 64 bytes, followed by the alphabet):
//!
//! | offset | size | field            |
//! |--------|------|------------------|
//! | 0      | 8    | magic            |
//! | 8      | 2    | version          |
//! | 10     | 1    | digest_bytes     |
//! | 11     | 1    | password_length  |
//! | 12     | 4    | chain_length     |
//! | 16     | 8    | target_entries   |
//! | 24     | 8    | actual_entries   |
//! | 32     | 8    | keyspace_size    |
//! | 40     | 8    | created_at       |
//! | 48     | 2    | alphabet_len     |
//! | 50     | 14   | reserved         |

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::constants::{FILE_FORMAT_VERSION, FILE_HEADER_SIZE, TABLE_MAGIC};
use crate::domain::keyspace::KeySpace;
use crate::domain::params::TableParams;
use crate::error::RainbowError;

/// Table metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableHeader {
    /// File format version
    pub version: u16,
    /// Chain length t
    pub chain_length: u32,
    /// Requested number of entries n
    pub target_entries: u64,
    /// Number of entries actually stored
    pub actual_entries: u64,
    /// Password alphabet
    pub alphabet: String,
    /// Password length
    pub password_length: usize,
    /// Truncated digest width in bytes
    pub digest_bytes: usize,
    /// Key space size N
    pub keyspace_size: u64,
    /// Creation timestamp (Unix epoch seconds)
    pub created_at: u64,
}

impl TableHeader {
    /// Create a header describing a table built with `params`
    pub fn new(params: &TableParams, target_entries: u64, actual_entries: u64) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            version: FILE_FORMAT_VERSION,
            chain_length: params.chain_length(),
            target_entries,
            actual_entries,
            alphabet: params.keyspace().alphabet().to_string(),
            password_length: params.keyspace().password_len(),
            digest_bytes: params.digest_bytes(),
            keyspace_size: params.keyspace().size(),
            created_at,
        }
    }

    /// Rebuild the table parameters this header describes
    ///
    /// # Errors
    /// `Params` if the metadata is not a valid configuration, or
    /// `KeySpaceMismatch` if the stored size disagrees with alphabet/length.
    pub fn params(&self) -> Result<TableParams, TableFormatError> {
        let keyspace = KeySpace::new(&self.alphabet, self.password_length)?;
        if keyspace.size() != self.keyspace_size {
            return Err(TableFormatError::KeySpaceMismatch {
                expected: keyspace.size(),
                found: self.keyspace_size,
            });
        }
        Ok(TableParams::new(
            keyspace,
            self.digest_bytes,
            self.chain_length,
        )?)
    }

    /// Bytes per stored entry (password followed by endpoint digest)
    pub fn entry_size(&self) -> usize {
        self.password_length + self.digest_bytes
    }

    /// Encoded header length including the alphabet block
    pub fn encoded_len(&self) -> usize {
        FILE_HEADER_SIZE + self.alphabet.len()
    }

    /// Serialize header to bytes (64 fixed bytes + alphabet)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());

        // Writes into a Vec cannot fail.
        buf.extend_from_slice(&TABLE_MAGIC);
        let _ = buf.write_u16::<LittleEndian>(self.version);
        buf.push(self.digest_bytes as u8);
        buf.push(self.password_length as u8);
        let _ = buf.write_u32::<LittleEndian>(self.chain_length);
        let _ = buf.write_u64::<LittleEndian>(self.target_entries);
        let _ = buf.write_u64::<LittleEndian>(self.actual_entries);
        let _ = buf.write_u64::<LittleEndian>(self.keyspace_size);
        let _ = buf.write_u64::<LittleEndian>(self.created_at);
        let _ = buf.write_u16::<LittleEndian>(self.alphabet.len() as u16);
        buf.resize(FILE_HEADER_SIZE, 0);
        buf.extend_from_slice(self.alphabet.as_bytes());

        buf
    }

    /// Length of the alphabet block announced by a fixed header
    pub fn alphabet_len(fixed: &[u8; FILE_HEADER_SIZE]) -> usize {
        u16::from_le_bytes([fixed[48], fixed[49]]) as usize
    }

    /// Deserialize header from bytes (fixed part followed by the alphabet)
    pub fn from_bytes(buf: &[u8]) -> Result<Self, TableFormatError> {
        if buf.len() < FILE_HEADER_SIZE {
            return Err(TableFormatError::Truncated {
                expected: FILE_HEADER_SIZE as u64,
                found: buf.len() as u64,
            });
        }
        if buf[0..8] != TABLE_MAGIC {
            return Err(TableFormatError::InvalidMagic);
        }

        let mut cursor = Cursor::new(&buf[8..FILE_HEADER_SIZE]);
        let version = cursor.read_u16::<LittleEndian>()?;
        if version != FILE_FORMAT_VERSION {
            return Err(TableFormatError::UnsupportedVersion(version));
        }
        let digest_bytes = cursor.read_u8()? as usize;
        let password_length = cursor.read_u8()? as usize;
        let chain_length = cursor.read_u32::<LittleEndian>()?;
        let target_entries = cursor.read_u64::<LittleEndian>()?;
        let actual_entries = cursor.read_u64::<LittleEndian>()?;
        let keyspace_size = cursor.read_u64::<LittleEndian>()?;
        let created_at = cursor.read_u64::<LittleEndian>()?;
        let alphabet_len = cursor.read_u16::<LittleEndian>()? as usize;

        let end = FILE_HEADER_SIZE + alphabet_len;
        if buf.len() < end {
            return Err(TableFormatError::Truncated {
                expected: end as u64,
                found: buf.len() as u64,
            });
        }
        let alphabet_bytes = &buf[FILE_HEADER_SIZE..end];
        let alphabet = String::from_utf8(alphabet_bytes.to_vec()).map_err(|_| {
            TableFormatError::InvalidMetadata {
                key: "alphabet".into(),
                value: String::from_utf8_lossy(alphabet_bytes).into_owned(),
            }
        })?;

        Ok(Self {
            version,
            chain_length,
            target_entries,
            actual_entries,
            alphabet,
            password_length,
            digest_bytes,
            keyspace_size,
            created_at,
        })
    }
}

/// Validation options for table loading
#[derive(Clone, Debug, Default)]
pub struct ValidationOptions {
    /// Expected chain length (None = skip validation)
    pub expected_chain_length: Option<u32>,
    /// Expected digest width in bytes (None = skip validation)
    pub expected_digest_bytes: Option<usize>,
    /// Expected alphabet (None = skip validation)
    pub expected_alphabet: Option<String>,
    /// Expected password length (None = skip validation)
    pub expected_password_length: Option<usize>,
    /// Require the table to have reached its target size
    pub require_complete: bool,
}

impl ValidationOptions {
    /// Create options that pin every parameter to `params`
    pub fn for_params(params: &TableParams) -> Self {
        Self {
            expected_chain_length: Some(params.chain_length()),
            expected_digest_bytes: Some(params.digest_bytes()),
            expected_alphabet: Some(params.keyspace().alphabet().to_string()),
            expected_password_length: Some(params.keyspace().password_len()),
            require_complete: false,
        }
    }

    /// Create options that accept whatever the file describes
    pub fn permissive() -> Self {
        Self::default()
    }
}

/// Table format errors
#[derive(Debug, Error)]
pub enum TableFormatError {
    /// Invalid magic number (not a valid table file)
    #[error("invalid file format: not a valid rainbow table file")]
    InvalidMagic,
    /// Unsupported format version
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),
    /// Data ended early
    #[error("truncated table: expected at least {expected} bytes, found {found}")]
    Truncated { expected: u64, found: u64 },
    /// Chain length mismatch
    #[error("chain length mismatch: expected {expected}, found {found}")]
    ChainLengthMismatch { expected: u32, found: u32 },
    /// Digest width mismatch
    #[error("digest width mismatch: expected {expected} bytes, found {found}")]
    DigestWidthMismatch { expected: usize, found: usize },
    /// Alphabet mismatch
    #[error("alphabet mismatch: expected {expected:?}, found {found:?}")]
    AlphabetMismatch { expected: String, found: String },
    /// Password length mismatch
    #[error("password length mismatch: expected {expected}, found {found}")]
    PasswordLengthMismatch { expected: usize, found: usize },
    /// Stored key space size disagrees with alphabet and length
    #[error("key space size mismatch: expected {expected}, found {found}")]
    KeySpaceMismatch { expected: u64, found: u64 },
    /// Number of stored entries disagrees with the header
    #[error("entry count mismatch: expected {expected}, found {found}")]
    EntryCountMismatch { expected: u64, found: u64 },
    /// Table stopped short of its target size
    #[error("table is incomplete: {actual} of {target} entries")]
    TableIncomplete { target: u64, actual: u64 },
    /// File size does not match expected size
    #[error("invalid file size: expected {expected} bytes, found {found} bytes")]
    InvalidFileSize { expected: u64, found: u64 },
    /// Required metadata key absent
    #[error("missing metadata: {0}")]
    MissingMetadata(&'static str),
    /// Metadata value could not be parsed
    #[error("invalid metadata {key}: {value:?}")]
    InvalidMetadata { key: String, value: String },
    /// Data row could not be parsed
    #[error("malformed row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    /// The same endpoint appears twice
    #[error("duplicate endpoint {0}")]
    DuplicateEndpoint(String),
    /// Metadata describes an invalid configuration
    #[error(transparent)]
    Params(#[from] RainbowError),
    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate header against options
pub fn validate_header(
    header: &TableHeader,
    options: &ValidationOptions,
) -> Result<(), TableFormatError> {
    if let Some(expected) = options.expected_chain_length
        && header.chain_length != expected
    {
        return Err(TableFormatError::ChainLengthMismatch {
            expected,
            found: header.chain_length,
        });
    }

    if let Some(expected) = options.expected_digest_bytes
        && header.digest_bytes != expected
    {
        return Err(TableFormatError::DigestWidthMismatch {
            expected,
            found: header.digest_bytes,
        });
    }

    if let Some(expected) = &options.expected_alphabet
        && header.alphabet != *expected
    {
        return Err(TableFormatError::AlphabetMismatch {
            expected: expected.clone(),
            found: header.alphabet.clone(),
        });
    }

    if let Some(expected) = options.expected_password_length
        && header.password_length != expected
    {
        return Err(TableFormatError::PasswordLengthMismatch {
            expected,
            found: header.password_length,
        });
    }

    if options.require_complete && header.actual_entries < header.target_entries {
        return Err(TableFormatError::TableIncomplete {
            target: header.target_entries,
            actual: header.actual_entries,
        });
    }

    // Also checks the stored key space size against alphabet and length
    header.params()?;

    Ok(())
}

/// Calculate expected binary file size from header
///
/// `None` when the entry count read from the file overflows `u64`.
pub fn expected_file_size(header: &TableHeader) -> Option<u64> {
    header
        .actual_entries
        .checked_mul(header.entry_size() as u64)?
        .checked_add(header.encoded_len() as u64)
}

/// Check an on-disk size against the size the header implies
pub fn check_file_size(header: &TableHeader, found: u64) -> Result<(), TableFormatError> {
    match expected_file_size(header) {
        Some(expected) if expected == found => Ok(()),
        Some(expected) => Err(TableFormatError::InvalidFileSize { expected, found }),
        None => Err(TableFormatError::InvalidFileSize {
            expected: u64::MAX,
            found,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> TableHeader {
        let params = TableParams::reference(100).unwrap();
        TableHeader::new(&params, 500, 480)
    }

    #[test]
    fn test_header_layout() {
        let bytes = header().to_bytes();
        assert_eq!(bytes.len(), FILE_HEADER_SIZE + 26);
        assert_eq!(&bytes[0..8], &TABLE_MAGIC);
        assert_eq!(bytes[10], 5);
        assert_eq!(bytes[11], 5);
        assert_eq!(&bytes[12..16], &100u32.to_le_bytes());
        assert_eq!(&bytes[16..24], &500u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &480u64.to_le_bytes());
        assert_eq!(&bytes[32..40], &11_881_376u64.to_le_bytes());
        assert_eq!(&bytes[48..50], &26u16.to_le_bytes());
        assert!(bytes[50..64].iter().all(|&b| b == 0));
        assert_eq!(&bytes[64..], b"abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn test_alphabet_len_from_fixed_header() {
        let bytes = header().to_bytes();
        let fixed: [u8; FILE_HEADER_SIZE] = bytes[..FILE_HEADER_SIZE].try_into().unwrap();
        assert_eq!(TableHeader::alphabet_len(&fixed), 26);
    }

    #[test]
    fn test_truncated_alphabet_block() {
        let bytes = header().to_bytes();
        let result = TableHeader::from_bytes(&bytes[..FILE_HEADER_SIZE + 3]);
        assert!(matches!(
            result,
            Err(TableFormatError::Truncated { expected: 90, found: 67 })
        ));
    }

    #[test]
    fn test_params_roundtrip() {
        let params = TableParams::reference(100).unwrap();
        let header = TableHeader::new(&params, 10, 10);
        assert_eq!(header.params().unwrap(), params);
    }

    #[test]
    fn test_params_keyspace_mismatch() {
        let mut header = header();
        header.keyspace_size += 1;
        assert!(matches!(
            header.params(),
            Err(TableFormatError::KeySpaceMismatch { .. })
        ));
    }

    #[test]
    fn test_expected_file_size() {
        let header = header();
        assert_eq!(expected_file_size(&header), Some(64 + 26 + 480 * 10));
        assert!(check_file_size(&header, 64 + 26 + 480 * 10).is_ok());
        assert!(matches!(
            check_file_size(&header, 64),
            Err(TableFormatError::InvalidFileSize { expected: 4890, found: 64 })
        ));
    }

    #[test]
    fn test_expected_file_size_overflow() {
        let mut header = header();
        header.actual_entries = u64::MAX / 4;
        assert_eq!(expected_file_size(&header), None);
        assert!(matches!(
            check_file_size(&header, 4890),
            Err(TableFormatError::InvalidFileSize { found: 4890, .. })
        ));
    }

    #[test]
    fn test_validate_incomplete() {
        let header = header();
        let options = ValidationOptions {
            require_complete: true,
            ..ValidationOptions::default()
        };
        assert!(matches!(
            validate_header(&header, &options),
            Err(TableFormatError::TableIncomplete {
                target: 500,
                actual: 480
            })
        ));
        assert!(validate_header(&header, &ValidationOptions::permissive()).is_ok());
    }
}
