//! Table parameters
//!
//! `TableParams` bundles everything the digest and reduction functions depend
//! on. Construction and search both take their configuration from the same
//! validated value, so they cannot disagree on width or chain length.

use crate::constants::{
    DEFAULT_ALPHABET, DEFAULT_CHAIN_LENGTH, DEFAULT_DIGEST_BYTES, DEFAULT_PASSWORD_LEN,
    MAX_DIGEST_BYTES,
};
use crate::domain::hash::{Digest, digest, min_digest_bytes, reduce_hash};
use crate::domain::keyspace::{KeySpace, Password};
use crate::error::RainbowError;

/// Validated key space, digest width and chain length
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableParams {
    keyspace: KeySpace,
    digest_bytes: usize,
    chain_length: u32,
}

impl TableParams {
    /// Create and validate table parameters
    ///
    /// # Errors
    /// - `DigestWidthOutOfRange` if `digest_bytes` exceeds 32 or cannot cover
    ///   the key space (`256^digest_bytes < N`)
    /// - `InvalidChainLength` if `chain_length` is zero
    pub fn new(
        keyspace: KeySpace,
        digest_bytes: usize,
        chain_length: u32,
    ) -> Result<Self, RainbowError> {
        let min = min_digest_bytes(keyspace.size());
        if digest_bytes < min || digest_bytes > MAX_DIGEST_BYTES {
            return Err(RainbowError::DigestWidthOutOfRange {
                found: digest_bytes,
                min,
                max: MAX_DIGEST_BYTES,
            });
        }
        if chain_length == 0 {
            return Err(RainbowError::InvalidChainLength(chain_length));
        }
        Ok(Self {
            keyspace,
            digest_bytes,
            chain_length,
        })
    }

    /// Five lowercase letters against SHA-256/40 with the given chain length
    pub fn reference(chain_length: u32) -> Result<Self, RainbowError> {
        let keyspace = KeySpace::new(DEFAULT_ALPHABET, DEFAULT_PASSWORD_LEN)?;
        Self::new(keyspace, DEFAULT_DIGEST_BYTES, chain_length)
    }

    /// Reference parameters with the default chain length
    pub fn default_reference() -> Result<Self, RainbowError> {
        Self::reference(DEFAULT_CHAIN_LENGTH)
    }

    /// Same key space and width, different chain length
    pub fn with_chain_length(&self, chain_length: u32) -> Result<Self, RainbowError> {
        Self::new(self.keyspace.clone(), self.digest_bytes, chain_length)
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    pub fn digest_bytes(&self) -> usize {
        self.digest_bytes
    }

    /// Digest width in bits
    pub fn digest_bits(&self) -> usize {
        self.digest_bytes * 8
    }

    pub fn chain_length(&self) -> u32 {
        self.chain_length
    }

    /// Digest function h
    #[inline]
    pub fn digest(&self, password: &Password) -> Digest {
        digest(password, self.digest_bytes)
    }

    /// Reduction function r(digest, position)
    #[inline]
    pub fn reduce(&self, hash: &Digest, position: u32) -> Password {
        reduce_hash(hash, position, &self.keyspace)
    }

    /// Reject digests whose width differs from the configured one
    pub fn check_digest(&self, hash: &Digest) -> Result<(), RainbowError> {
        if hash.len() != self.digest_bytes {
            return Err(RainbowError::InvalidDigestWidth {
                expected: self.digest_bytes,
                found: hash.len(),
            });
        }
        Ok(())
    }

    /// Theoretical coverage n·t / N, ignoring collisions and merges
    pub fn theoretical_coverage(&self, entries: u64) -> f64 {
        entries as f64 * self.chain_length as f64 / self.keyspace.size() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_params() {
        let params = TableParams::reference(1000).unwrap();
        assert_eq!(params.keyspace().size(), 11_881_376);
        assert_eq!(params.digest_bytes(), 5);
        assert_eq!(params.digest_bits(), 40);
        assert_eq!(params.chain_length(), 1000);
    }

    #[test]
    fn test_digest_too_narrow_for_keyspace() {
        let keyspace = KeySpace::new(DEFAULT_ALPHABET, DEFAULT_PASSWORD_LEN).unwrap();
        let result = TableParams::new(keyspace, 2, 100);
        assert_eq!(
            result,
            Err(RainbowError::DigestWidthOutOfRange {
                found: 2,
                min: 3,
                max: 32
            })
        );
    }

    #[test]
    fn test_digest_too_wide() {
        let keyspace = KeySpace::new("ab", 3).unwrap();
        assert!(matches!(
            TableParams::new(keyspace, 33, 10),
            Err(RainbowError::DigestWidthOutOfRange { found: 33, .. })
        ));
    }

    #[test]
    fn test_zero_chain_length() {
        assert_eq!(
            TableParams::reference(0),
            Err(RainbowError::InvalidChainLength(0))
        );
    }

    #[test]
    fn test_check_digest_width() {
        let params = TableParams::reference(10).unwrap();
        let good = Digest::from_hex("0102030405").unwrap();
        let bad = Digest::from_hex("01020304").unwrap();
        assert!(params.check_digest(&good).is_ok());
        assert_eq!(
            params.check_digest(&bad),
            Err(RainbowError::InvalidDigestWidth {
                expected: 5,
                found: 4
            })
        );
    }

    #[test]
    fn test_theoretical_coverage() {
        let params = TableParams::reference(1000).unwrap();
        let coverage = params.theoretical_coverage(11_881);
        assert!((coverage - 11_881_000.0 / 11_881_376.0).abs() < 1e-12);
    }
}
