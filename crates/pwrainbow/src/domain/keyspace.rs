//! Password key space
//!
//! A key space is a fixed alphabet and a fixed password length. Every password
//! corresponds to exactly one index in `[0, N)` with `N = |alphabet|^length`:
//! the index is the password read as a big-endian base-|alphabet| number, so
//! with the lowercase alphabet index 0 is `"aaaaa"` and index 1 is `"aaaab"`.

use std::fmt;

use rand::Rng;

use crate::constants::MAX_PASSWORD_LEN;
use crate::error::RainbowError;

const NOT_IN_ALPHABET: u8 = u8::MAX;

/// Fixed-length password over an ASCII alphabet
///
/// Stored inline so chain walks never allocate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Password {
    bytes: [u8; MAX_PASSWORD_LEN],
    len: u8,
}

impl Password {
    fn from_ascii(bytes: &[u8]) -> Self {
        let mut buf = [0u8; MAX_PASSWORD_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            bytes: buf,
            len: bytes.len() as u8,
        }
    }

    /// Raw password bytes (the input fed to the digest function)
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Password as text
    pub fn as_str(&self) -> &str {
        // Only a KeySpace builds passwords, and its alphabet is ASCII.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password({:?})", self.as_str())
    }
}

/// Alphabet, password length and the index ↔ password bijection
#[derive(Clone, PartialEq, Eq)]
pub struct KeySpace {
    alphabet: Vec<u8>,
    /// Symbol → digit, `NOT_IN_ALPHABET` for foreign bytes
    digits: [u8; 256],
    length: usize,
    size: u64,
}

impl KeySpace {
    /// Create a key space
    ///
    /// # Errors
    /// - `InvalidAlphabet` if the alphabet is empty, has non-graphic ASCII or
    ///   repeats a symbol
    /// - `InvalidPasswordLength` if `length` is not in `1..=MAX_PASSWORD_LEN`
    /// - `KeySpaceTooLarge` if the size overflows `u64`
    pub fn new(alphabet: &str, length: usize) -> Result<Self, RainbowError> {
        if alphabet.is_empty() {
            return Err(RainbowError::InvalidAlphabet("alphabet is empty".into()));
        }
        if alphabet.len() > 255 {
            return Err(RainbowError::InvalidAlphabet(format!(
                "alphabet has {} symbols (at most 255)",
                alphabet.len()
            )));
        }
        if length == 0 || length > MAX_PASSWORD_LEN {
            return Err(RainbowError::InvalidPasswordLength {
                length,
                max: MAX_PASSWORD_LEN,
            });
        }

        let mut digits = [NOT_IN_ALPHABET; 256];
        for (digit, symbol) in alphabet.bytes().enumerate() {
            if !symbol.is_ascii_graphic() {
                return Err(RainbowError::InvalidAlphabet(format!(
                    "symbol {:?} is not printable ASCII",
                    symbol as char
                )));
            }
            if digits[symbol as usize] != NOT_IN_ALPHABET {
                return Err(RainbowError::InvalidAlphabet(format!(
                    "symbol {:?} appears more than once",
                    symbol as char
                )));
            }
            digits[symbol as usize] = digit as u8;
        }

        let size = (alphabet.len() as u64)
            .checked_pow(length as u32)
            .ok_or(RainbowError::KeySpaceTooLarge {
                alphabet_size: alphabet.len(),
                length,
            })?;

        Ok(Self {
            alphabet: alphabet.as_bytes().to_vec(),
            digits,
            length,
            size,
        })
    }

    /// Alphabet as text
    pub fn alphabet(&self) -> &str {
        std::str::from_utf8(&self.alphabet).unwrap_or_default()
    }

    /// Password length
    pub fn password_len(&self) -> usize {
        self.length
    }

    /// Number of passwords (N)
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Convert an index to its password
    ///
    /// # Errors
    /// `InvalidIndex` if `index >= N`.
    pub fn index_to_password(&self, index: u64) -> Result<Password, RainbowError> {
        if index >= self.size {
            return Err(RainbowError::InvalidIndex {
                index,
                keyspace_size: self.size,
            });
        }
        Ok(self.password_from_index(index))
    }

    /// Index → password for indices already reduced modulo N
    #[inline]
    pub(crate) fn password_from_index(&self, mut index: u64) -> Password {
        let base = self.alphabet.len() as u64;
        let mut buf = [0u8; MAX_PASSWORD_LEN];
        for slot in buf[..self.length].iter_mut().rev() {
            *slot = self.alphabet[(index % base) as usize];
            index /= base;
        }
        Password {
            bytes: buf,
            len: self.length as u8,
        }
    }

    /// Convert a password to its index
    ///
    /// # Errors
    /// `InvalidPassword` if the password has the wrong length or a symbol
    /// outside the alphabet (i.e. it was built by another key space).
    pub fn password_to_index(&self, password: &Password) -> Result<u64, RainbowError> {
        self.index_of_bytes(password.as_bytes())
    }

    /// Parse user-supplied text into a password of this key space
    pub fn parse_password(&self, text: &str) -> Result<Password, RainbowError> {
        self.password_from_bytes(text.as_bytes())
    }

    /// Validate raw bytes (e.g. read from a table file) as a password
    pub fn password_from_bytes(&self, bytes: &[u8]) -> Result<Password, RainbowError> {
        self.index_of_bytes(bytes)?;
        Ok(Password::from_ascii(bytes))
    }

    /// Draw a uniformly random password
    pub fn random_password<R: Rng + ?Sized>(&self, rng: &mut R) -> Password {
        self.password_from_index(rng.gen_range(0..self.size))
    }

    fn index_of_bytes(&self, bytes: &[u8]) -> Result<u64, RainbowError> {
        if bytes.len() != self.length {
            return Err(RainbowError::InvalidPassword {
                password: String::from_utf8_lossy(bytes).into_owned(),
                reason: "wrong length",
            });
        }
        let base = self.alphabet.len() as u64;
        let mut index = 0u64;
        for &symbol in bytes {
            let digit = self.digits[symbol as usize];
            if digit == NOT_IN_ALPHABET {
                return Err(RainbowError::InvalidPassword {
                    password: String::from_utf8_lossy(bytes).into_owned(),
                    reason: "symbol outside the alphabet",
                });
            }
            index = index * base + digit as u64;
        }
        Ok(index)
    }
}

impl fmt::Debug for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySpace")
            .field("alphabet", &self.alphabet())
            .field("length", &self.length)
            .field("size", &self.size)
            .finish()
    }
}
