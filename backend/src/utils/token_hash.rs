//! Deterministic fingerprints for bearer secrets.
//!
//! Game-login tokens, plugin API tokens and session tokens are stored and
//! looked up by their SHA-256 digest so the plaintext secret never touches
//! the database or the logs. Equality checks run on fixed-length digests.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of a bearer secret.
pub fn fingerprint(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}
