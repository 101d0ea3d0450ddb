// Password hashing for locally provisioned accounts

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hex encoded SHA-256 of the password, the format stored in `password_hash`
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a submitted password against a stored hash in constant time
pub fn verify_password(password: &str, expected_hash: &str) -> bool {
    let actual = hash_password(password);
    let expected = expected_hash.trim().to_ascii_lowercase();
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}
