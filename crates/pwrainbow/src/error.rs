//! Configuration and programmer errors
//!
//! Algorithmic outcomes (a search that finds nothing, a table that stopped
//! short of its target size) are ordinary return values and never appear here.

use thiserror::Error;

/// Errors raised by key space, digest and table parameter handling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RainbowError {
    /// Index outside `[0, keyspace_size)`
    #[error("index {index} is outside the key space [0, {keyspace_size})")]
    InvalidIndex { index: u64, keyspace_size: u64 },

    /// Digest length differs from the configured width
    #[error("invalid digest width: expected {expected} bytes, found {found}")]
    InvalidDigestWidth { expected: usize, found: usize },

    /// Configured digest width cannot be produced or cannot cover the key space
    #[error("digest width {found} bytes is out of range (must be {min}..={max} bytes)")]
    DigestWidthOutOfRange { found: usize, min: usize, max: usize },

    /// Alphabet is empty, non-ASCII or contains duplicates
    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),

    /// Password length is zero or exceeds the inline buffer
    #[error("invalid password length {length} (must be 1..={max})")]
    InvalidPasswordLength { length: usize, max: usize },

    /// alphabet_size^length does not fit in 64 bits
    #[error("key space {alphabet_size}^{length} does not fit in 64 bits")]
    KeySpaceTooLarge { alphabet_size: usize, length: usize },

    /// Chains need at least one link
    #[error("invalid chain length {0} (must be at least 1)")]
    InvalidChainLength(u32),

    /// Password text that does not belong to the key space
    #[error("invalid password {password:?}: {reason}")]
    InvalidPassword {
        password: String,
        reason: &'static str,
    },

    /// Malformed hexadecimal digest
    #[error("invalid digest hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Key space too large for an in-memory reachability bitmap
    #[error("key space of {keyspace_size} passwords is too large for a coverage bitmap")]
    BitmapTooLarge { keyspace_size: u64 },
}
