// src/recipe/kitchen/verify.rs

//! Source integrity verification

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, Hash};

/// Parse an expected checksum string
pub fn parse_checksum(expected: &str) -> Result<Hash> {
    Hash::parse_prefixed(expected).map_err(|e| Error::InvalidChecksum {
        checksum: expected.to_string(),
        reason: e.to_string(),
    })
}

/// Verify artifact bytes against an expected checksum
///
/// The expected checksum is `algorithm:hex` or bare hex (algorithm inferred
/// from length). Hex comparison ignores case. A mismatch is always an error.
pub fn verify(artifact: &[u8], expected: &str) -> Result<()> {
    let expected_hash = parse_checksum(expected)?;
    let actual = hash_bytes(expected_hash.algorithm, artifact);

    if actual.matches(&expected_hash) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected_hash.to_prefixed_string(),
            actual: actual.to_prefixed_string(),
        })
    }
}
