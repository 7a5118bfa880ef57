//! Content digest utilities with a selectable algorithm (SHA-256 default, SHA-1
//! retained for interoperability). A `Hasher` is a small stateless value
//! configured at construction; `Digest` is the resulting content-addressed
//! identity, always rendered as lowercase hex with a total lexicographic order.

use std::{fmt::Display, io, str::FromStr};

use serde::{Deserialize, Serialize};
use sha1::Digest as _;
use sha2::Digest as _;

use crate::errors::LinageError;

/// Selectable hash algorithm for a `Hasher`. Defaults to SHA-256, matching
/// the data model's 32-byte / 64-hex-char `Digest`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha1,
}

impl HashAlgorithm {
    pub const fn size(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha1 => 20,
        }
    }

    pub const fn hex_len(&self) -> usize {
        self.size() * 2
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = LinageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha1" => Ok(HashAlgorithm::Sha1),
            other => Err(LinageError::InvalidInput(format!(
                "unknown hash algorithm `{other}`"
            ))),
        }
    }
}

/// A content digest: either a 32-byte SHA-256 or a 20-byte SHA-1 value,
/// always displayed as lowercase hex. Ordered lexicographically by hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Digest {
    Sha256([u8; 32]),
    Sha1([u8; 20]),
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl Default for Digest {
    fn default() -> Self {
        Digest::Sha256([0u8; 32])
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.as_ref()))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        match self {
            Digest::Sha256(bytes) => bytes.as_slice(),
            Digest::Sha1(bytes) => bytes.as_slice(),
        }
    }
}

impl FromStr for Digest {
    type Err = LinageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.len() {
            64 => {
                let mut h = [0u8; 32];
                hex::decode_to_slice(s, &mut h)
                    .map_err(|e| LinageError::InvalidInput(format!("malformed digest: {e}")))?;
                Ok(Digest::Sha256(h))
            }
            40 => {
                let mut h = [0u8; 20];
                hex::decode_to_slice(s, &mut h)
                    .map_err(|e| LinageError::InvalidInput(format!("malformed digest: {e}")))?;
                Ok(Digest::Sha1(h))
            }
            n => Err(LinageError::InvalidInput(format!(
                "digest must be 40 or 64 hex characters, got {n}"
            ))),
        }
    }
}

impl Digest {
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Digest::Sha256(_) => HashAlgorithm::Sha256,
            Digest::Sha1(_) => HashAlgorithm::Sha1,
        }
    }

    /// An all-zero digest for the given algorithm, used as a sentinel for
    /// "no content" (e.g. a deleted `FileRecord`).
    pub fn zero(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Digest::Sha256([0u8; 32]),
            HashAlgorithm::Sha1 => Digest::Sha1([0u8; 20]),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_ref().iter().all(|b| *b == 0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_ref())
    }
}

/// Computes stable content digests over bytes, UTF-8 text, and streams.
/// Stateless and `Copy`: pass it around by value.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hasher {
    algorithm: HashAlgorithm,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hash_bytes(&self, bytes: &[u8]) -> Digest {
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = sha2::Sha256::new();
                hasher.update(bytes);
                let out = hasher.finalize();
                let mut buf = [0u8; 32];
                buf.copy_from_slice(&out);
                Digest::Sha256(buf)
            }
            HashAlgorithm::Sha1 => {
                let mut hasher = sha1::Sha1::new();
                hasher.update(bytes);
                let out = hasher.finalize();
                let mut buf = [0u8; 20];
                buf.copy_from_slice(&out);
                Digest::Sha1(buf)
            }
        }
    }

    pub fn hash_text(&self, text: &str) -> Digest {
        self.hash_bytes(text.as_bytes())
    }

    /// Hashes an entire reader, buffering through a fixed-size window so
    /// arbitrarily large streams never need to be materialized in memory.
    pub fn hash_stream<R: io::Read>(&self, mut reader: R) -> Result<Digest, LinageError> {
        let mut buf = [0u8; 64 * 1024];
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = sha2::Sha256::new();
                loop {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                let out = hasher.finalize();
                let mut digest = [0u8; 32];
                digest.copy_from_slice(&out);
                Ok(Digest::Sha256(digest))
            }
            HashAlgorithm::Sha1 => {
                let mut hasher = sha1::Sha1::new();
                loop {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                let out = hasher.finalize();
                let mut digest = [0u8; 20];
                digest.copy_from_slice(&out);
                Ok(Digest::Sha1(digest))
            }
        }
    }

    /// Content is public; this is a plain equality check, not a
    /// constant-time comparison (there is no secret to protect here).
    pub fn verify(&self, text: &str, expected: &Digest) -> bool {
        self.hash_text(text) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let digest = hasher.hash_bytes(b"Hello, world!");
        assert_eq!(
            digest.to_string(),
            "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );
    }

    #[test]
    fn sha1_matches_known_vector() {
        let hasher = Hasher::new(HashAlgorithm::Sha1);
        let digest = hasher.hash_bytes(b"Hello, world!");
        assert_eq!(digest.to_string(), "943a702d06f34599aee1f8da8ef9f7296031d699");
    }

    #[test]
    fn hash_stream_matches_hash_bytes() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let data = b"the quick brown fox jumps over the lazy dog".repeat(1000);
        let from_bytes = hasher.hash_bytes(&data);
        let from_stream = hasher.hash_stream(std::io::Cursor::new(&data)).unwrap();
        assert_eq!(from_bytes, from_stream);
    }

    #[test]
    fn digest_round_trips_through_hex() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let digest = hasher.hash_text("hello\n");
        let parsed: Digest = digest.to_string().parse().unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn unknown_algorithm_name_is_invalid_input() {
        let err = "blake3".parse::<HashAlgorithm>().unwrap_err();
        assert!(matches!(err, LinageError::InvalidInput(_)));
    }

    #[test]
    fn verify_checks_content_equality() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let digest = hasher.hash_text("line one\n");
        assert!(hasher.verify("line one\n", &digest));
        assert!(!hasher.verify("line two\n", &digest));
    }
}
