//! MD5 hash type and file hashing
//!
//! Release archives publish a detached MD5 hash and the checksum API lists
//! MD5 hashes per installed file. This module provides a compact hash type
//! for both, plus streaming hashing of files on disk.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::constants::files;
use crate::errors::IntegrityError;

/// MD5 hash stored as its raw 16 bytes
///
/// Serialized as a lowercase hex string, the form used by `.md5` files and
/// the checksum API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Md5Hash([u8; 16]);

impl Md5Hash {
    /// Parse a 32-character hex digest, in either case
    ///
    /// # Examples
    ///
    /// ```rust
    /// use core_fetcher::app::Md5Hash;
    ///
    /// let published = Md5Hash::from_hex("A1F3B0E6C2D94B7E8F0A1B2C3D4E5F60")?;
    /// assert_eq!(published.to_hex(), "a1f3b0e6c2d94b7e8f0a1b2c3d4e5f60");
    /// # Ok::<(), core_fetcher::errors::IntegrityError>(())
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, IntegrityError> {
        let digits = hex.as_bytes();
        if digits.len() != 32 {
            return Err(IntegrityError::InvalidHash {
                hash: hex.to_string(),
            });
        }

        let nibble = |digit: u8| {
            char::from(digit)
                .to_digit(16)
                .map(|value| value as u8)
                .ok_or_else(|| IntegrityError::InvalidHash {
                    hash: hex.to_string(),
                })
        };

        let mut digest = [0u8; 16];
        for (byte, pair) in digest.iter_mut().zip(digits.chunks_exact(2)) {
            *byte = nibble(pair[0])? << 4 | nibble(pair[1])?;
        }
        Ok(Self(digest))
    }

    /// Lowercase hex digest, as published next to release archives
    pub fn to_hex(&self) -> String {
        format!("{:x}", md5::Digest(self.0))
    }

    /// Hash an in-memory buffer
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    /// Hash a file on disk in fixed-size chunks
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::Unreadable` if the file cannot be opened or read
    pub async fn of_file(path: &Path) -> Result<Self, IntegrityError> {
        let unreadable = |source| IntegrityError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::open(path).await.map_err(unreadable)?;
        let mut context = md5::Context::new();
        let mut chunk = vec![0u8; files::HASH_CHUNK_SIZE];

        loop {
            match file.read(&mut chunk).await.map_err(unreadable)? {
                0 => break,
                n => context.consume(&chunk[..n]),
            }
        }

        Ok(Self(context.compute().0))
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Md5Hash {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Md5Hash {
    type Error = IntegrityError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Self::from_hex(&hex)
    }
}

impl From<Md5Hash> for String {
    fn from(hash: Md5Hash) -> Self {
        hash.to_hex()
    }
}
