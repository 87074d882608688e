//! Rainbow table related constants
//!
//! Defaults describe the reference configuration: five lowercase letters
//! against SHA-256 truncated to 40 bits.

// =============================================================================
// Key space parameters
// =============================================================================

/// Default password alphabet
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Default password length
pub const DEFAULT_PASSWORD_LEN: usize = 5;

/// Longest supported password (passwords live in a fixed inline buffer)
pub const MAX_PASSWORD_LEN: usize = 16;

// =============================================================================
// Digest parameters
// =============================================================================

/// Default truncated digest width in bytes (40 bits)
pub const DEFAULT_DIGEST_BYTES: usize = 5;

/// Full SHA-256 output width in bytes
pub const MAX_DIGEST_BYTES: usize = 32;

// =============================================================================
// Rainbow table parameters
// =============================================================================

/// Default chain length (t = 1,000)
#[cfg(not(test))]
pub const DEFAULT_CHAIN_LENGTH: u32 = 1000;

/// Default chain length (t = 64) - reduced for faster unit tests
#[cfg(test)]
pub const DEFAULT_CHAIN_LENGTH: u32 = 64;

/// Default number of entries (n = 11,813)
///
/// With t = 1,000 this gives n·t ≈ N for the default key space (26^5).
#[cfg(not(test))]
pub const DEFAULT_TABLE_ENTRIES: u64 = 11_813;

/// Default number of entries (n = 256) - reduced for faster unit tests
#[cfg(test)]
pub const DEFAULT_TABLE_ENTRIES: u64 = 256;

/// Attempt budget multiplier (attempt_budget = n × factor)
pub const DEFAULT_ATTEMPT_FACTOR: u64 = 10;

/// Chains computed per parallel construction batch
pub const BUILD_BATCH_SIZE: usize = 4096;

// =============================================================================
// File format
// =============================================================================

/// Magic number identifying a binary table file
pub const TABLE_MAGIC: [u8; 8] = *b"PWRBOW\0\0";

/// Current binary format version
pub const FILE_FORMAT_VERSION: u16 = 1;

/// Fixed binary header size in bytes (the alphabet block follows it)
pub const FILE_HEADER_SIZE: usize = 64;

/// Column header of the CSV data section
pub const CSV_COLUMNS: [&str; 2] = ["initial_password", "final_hash_hex"];
