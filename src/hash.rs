// src/hash.rs

//! Digest algorithms for source integrity checks
//!
//! Recipes pin their source archive (and optionally each patch) to a digest.
//! Three algorithms are accepted:
//!
//! | Algorithm | Hex length | Notes |
//! |-----------|-----------|-------|
//! | MD5       | 32        | Legacy; still found in older recipes |
//! | SHA-256   | 64        | Default for new recipes |
//! | SHA-512   | 128       | |
//!
//! Checksums are written either prefixed (`sha256:abc...`) or bare. A bare
//! checksum selects its algorithm from the hex length.

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// MD5 (128-bit, not collision resistant)
    Md5,
    /// SHA-256 (256-bit cryptographic hash)
    #[default]
    Sha256,
    /// SHA-512 (512-bit cryptographic hash)
    Sha512,
}

impl HashAlgorithm {
    /// Get the hash output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Get the hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Pick the algorithm whose hex digest has the given length
    pub fn from_hex_len(len: usize) -> Option<Self> {
        [Self::Md5, Self::Sha256, Self::Sha512]
            .into_iter()
            .find(|algo| algo.hex_len() == len)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Unknown hash algorithm name
    UnknownAlgorithm(String),
    /// Hash string has wrong length for algorithm
    InvalidLength { expected: usize, got: usize },
    /// Hash string contains invalid hex characters
    InvalidHex(String),
    /// Bare hash whose length matches no algorithm
    AmbiguousLength(usize),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown hash algorithm: {}", name),
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid hash length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in hash: {}", s),
            Self::AmbiguousLength(len) => {
                write!(f, "no hash algorithm produces {} hex characters", len)
            }
        }
    }
}

impl std::error::Error for HashError {}

/// A hash value with its algorithm
///
/// The value is always stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    /// The algorithm used
    pub algorithm: HashAlgorithm,
    /// The hash value as a hex string
    pub value: String,
}

impl Hash {
    /// Create a new hash value, validating length and hex characters
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        let expected_len = algorithm.hex_len();

        if value.len() != expected_len {
            return Err(HashError::InvalidLength {
                expected: expected_len,
                got: value.len(),
            });
        }

        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(value));
        }

        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    /// Get the hash value as a hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Parse a prefixed (`sha256:abc...`) or bare hash string
    ///
    /// Bare strings pick their algorithm from their length.
    pub fn parse_prefixed(s: &str) -> Result<Self, HashError> {
        let s = s.trim();
        if let Some((algo, hash)) = s.split_once(':') {
            let algorithm = algo.parse()?;
            Self::new(algorithm, hash)
        } else {
            let algorithm =
                HashAlgorithm::from_hex_len(s.len()).ok_or(HashError::AmbiguousLength(s.len()))?;
            Self::new(algorithm, s)
        }
    }

    /// Format as a prefixed string (e.g., "sha256:abc123...")
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.value)
    }

    /// Case-insensitive comparison against a hex digest
    pub fn matches(&self, other: &Hash) -> bool {
        self.algorithm == other.algorithm && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let value = match algorithm {
        HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
    };
    Hash { algorithm, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hash_bytes(HashAlgorithm::Md5, b"").value,
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            hash_bytes(HashAlgorithm::Sha256, b"Hello, World!").value,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(hash_bytes(HashAlgorithm::Sha512, b"").value.len(), 128);
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha-512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_parse_prefixed() {
        let hash = Hash::parse_prefixed("md5:21479C95990EEFE7650DF582426457F9").unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Md5);
        assert_eq!(hash.value, "21479c95990eefe7650df582426457f9");
        assert_eq!(hash.to_prefixed_string(), "md5:21479c95990eefe7650df582426457f9");
    }

    #[test]
    fn test_parse_bare_infers_algorithm() {
        let md5 = Hash::parse_prefixed("21479c95990eefe7650df582426457f9").unwrap();
        assert_eq!(md5.algorithm, HashAlgorithm::Md5);

        let sha = Hash::parse_prefixed(
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        )
        .unwrap();
        assert_eq!(sha.algorithm, HashAlgorithm::Sha256);

        assert_eq!(
            Hash::parse_prefixed("abc123"),
            Err(HashError::AmbiguousLength(6))
        );
    }

    #[test]
    fn test_invalid_hashes() {
        assert!(matches!(
            Hash::parse_prefixed("sha256:abc"),
            Err(HashError::InvalidLength { expected: 64, got: 3 })
        ));
        assert!(matches!(
            Hash::parse_prefixed("md5:zz479c95990eefe7650df582426457f9"),
            Err(HashError::InvalidHex(_))
        ));
        assert!(matches!(
            Hash::parse_prefixed("blake3:abc"),
            Err(HashError::UnknownAlgorithm(_))
        ));
    }
}
