//! Password coverage bitmap for tracking reachable passwords
//!
//! This module provides a bitmap data structure for tracking which key space
//! indices are reachable from a rainbow table. It uses atomic operations for
//! thread-safe concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RainbowError;

/// Largest key space a bitmap is built for (2^36 bits = 8 GiB)
pub const MAX_BITMAP_BITS: u64 = 1 << 36;

/// Password reachability bitmap
///
/// Tracks reachability for every index in `[0, N)` using 1 bit per password.
/// Memory usage: N / 8 bytes (about 1.5 MB for 26^5).
///
/// Uses `AtomicU64` for thread-safe concurrent bit setting.
pub struct KeyspaceBitmap {
    /// Bitmap storage (64 bits per element)
    bits: Vec<AtomicU64>,
    /// Number of valid bits (N)
    size: u64,
}

impl KeyspaceBitmap {
    /// Create a new bitmap with all bits set to 0
    ///
    /// # Errors
    /// `BitmapTooLarge` if `size` exceeds `MAX_BITMAP_BITS`.
    pub fn new(size: u64) -> Result<Self, RainbowError> {
        if size > MAX_BITMAP_BITS {
            return Err(RainbowError::BitmapTooLarge {
                keyspace_size: size,
            });
        }
        let words = size.div_ceil(64) as usize;
        let bits = (0..words).map(|_| AtomicU64::new(0)).collect();
        Ok(Self { bits, size })
    }

    /// Number of tracked indices
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Set the bit for the specified index (thread-safe)
    ///
    /// Indices outside `[0, N)` are ignored.
    #[inline]
    pub fn set(&self, index: u64) {
        if index >= self.size {
            return;
        }
        let word = (index / 64) as usize;
        let bit = 1u64 << (index % 64);
        self.bits[word].fetch_or(bit, Ordering::Relaxed);
    }

    /// Check if the specified index is reachable
    #[inline]
    pub fn is_set(&self, index: u64) -> bool {
        if index >= self.size {
            return false;
        }
        let word = (index / 64) as usize;
        let bit = 1u64 << (index % 64);
        (self.bits[word].load(Ordering::Relaxed) & bit) != 0
    }

    /// Count the number of reachable indices
    pub fn count_reachable(&self) -> u64 {
        self.bits
            .iter()
            .map(|atomic| atomic.load(Ordering::Relaxed).count_ones() as u64)
            .sum()
    }

    /// Count the number of unreachable indices
    pub fn count_missing(&self) -> u64 {
        self.size - self.count_reachable()
    }

    /// Extract all unreachable indices
    pub fn extract_missing(&self) -> Vec<u64> {
        let mut missing = Vec::new();

        for (i, atomic) in self.bits.iter().enumerate() {
            let bits = atomic.load(Ordering::Relaxed);
            if bits == u64::MAX {
                continue;
            }

            let base = (i as u64) * 64;
            for bit_pos in 0..64u64 {
                let index = base + bit_pos;
                if index >= self.size {
                    break;
                }
                if (bits & (1u64 << bit_pos)) == 0 {
                    missing.push(index);
                }
            }
        }

        missing
    }
}
