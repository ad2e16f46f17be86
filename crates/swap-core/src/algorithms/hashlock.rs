//! # Secret Generation and Verification
//!
//! Generate the swap secret, commit to it, verify a candidate.

use rand::RngCore;

use crate::domain::{HashLock, Secret, ValidationError, SECRET_LEN};

/// Generate a cryptographically secure random secret.
pub fn generate_secret() -> Secret {
    let mut bytes = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = Secret::new(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    secret
}

/// SHA-256 commitment. Deterministic.
pub fn commit(secret: &Secret) -> HashLock {
    HashLock::commit(secret)
}

/// Whether `secret` opens `hash_lock`. Pure.
pub fn verify(hash_lock: &HashLock, secret: &Secret) -> bool {
    hash_lock.matches(secret)
}

/// Parse and verify raw secret bytes in one step.
///
/// Wrong length fails before any chain interaction.
pub fn verify_bytes(hash_lock: &HashLock, candidate: &[u8]) -> Result<bool, ValidationError> {
    let secret = Secret::from_slice(candidate)?;
    Ok(verify(hash_lock, &secret))
}
