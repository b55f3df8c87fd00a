use sha2::{Digest, Sha256};

/// Unsalted SHA-256 of the plaintext, lowercase hex.
///
/// Deterministic: the same plaintext always yields the same 64 character digest.
/// This is example-grade credential storage, not a password KDF.
pub fn hash_password(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(plain: &str, hash: &str) -> bool {
    hash_password(plain) == hash
}
