//! Hash function implementations
//!
//! This module provides the truncated SHA-256 digest function and the
//! position-dependent reduction function for the rainbow table algorithm.

use std::fmt;

use sha2::{Digest as _, Sha256};

use crate::constants::MAX_DIGEST_BYTES;
use crate::domain::keyspace::{KeySpace, Password};
use crate::error::RainbowError;

/// Truncated digest (1 to 32 bytes)
///
/// Unused tail bytes are always zero, so derived equality and hashing are
/// byte-exact over the used prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    bytes: [u8; MAX_DIGEST_BYTES],
    len: u8,
}

impl Digest {
    /// Build a digest from raw bytes
    ///
    /// # Errors
    /// `DigestWidthOutOfRange` if the slice is empty or longer than 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RainbowError> {
        if bytes.is_empty() || bytes.len() > MAX_DIGEST_BYTES {
            return Err(RainbowError::DigestWidthOutOfRange {
                found: bytes.len(),
                min: 1,
                max: MAX_DIGEST_BYTES,
            });
        }
        let mut buf = [0u8; MAX_DIGEST_BYTES];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: buf,
            len: bytes.len() as u8,
        })
    }

    /// Parse a hex digest (case-insensitive, optional `0x` prefix)
    pub fn from_hex(text: &str) -> Result<Self, RainbowError> {
        let text = text.trim();
        let text = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        let bytes = hex::decode(text)?;
        Self::from_slice(&bytes)
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Compute the digest of a password
///
/// SHA-256 over the password's ASCII bytes, truncated to `width` bytes.
/// `width` is clamped to `1..=32`; callers validate it through `TableParams`.
#[inline]
pub fn digest(password: &Password, width: usize) -> Digest {
    let full = Sha256::digest(password.as_bytes());
    let width = width.clamp(1, MAX_DIGEST_BYTES);
    let mut bytes = [0u8; MAX_DIGEST_BYTES];
    bytes[..width].copy_from_slice(&full[..width]);
    Digest {
        bytes,
        len: width as u8,
    }
}

/// Reduce a digest to a key space index
///
/// `(int_be(digest) + position) mod keyspace_size`, where `int_be` reads the
/// digest as a big-endian integer. The modulus is taken byte by byte so the
/// result is exact for every digest width.
#[inline]
pub fn reduce_index(hash: &Digest, position: u32, keyspace_size: u64) -> u64 {
    let modulus = keyspace_size as u128;
    let mut acc: u128 = 0;
    for &byte in hash.as_bytes() {
        acc = ((acc << 8) | byte as u128) % modulus;
    }
    ((acc + position as u128) % modulus) as u64
}

/// Reduce a digest to a password at the given chain position
#[inline]
pub fn reduce_hash(hash: &Digest, position: u32, keyspace: &KeySpace) -> Password {
    keyspace.password_from_index(reduce_index(hash, position, keyspace.size()))
}

/// Smallest digest width (bytes) whose value range covers `keyspace_size`
pub fn min_digest_bytes(keyspace_size: u64) -> usize {
    let mut width = 1;
    while width < 8 && (1u64 << (8 * width)) < keyspace_size {
        width += 1;
    }
    width
}
