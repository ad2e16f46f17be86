//! # Secret and HashLock
//!
//! The swap secret and its SHA-256 commitment.
//!
//! ## Security
//!
//! `Secret` zeroizes its bytes on drop and never prints them through
//! `Debug`. The only way out is `as_bytes()`, used when building a
//! withdrawal or persisting the handoff artifact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use tracing::info;

use super::errors::{Hash, SwapError, ValidationError, SECRET_LEN};
use super::escrow::DestinationFunded;

/// A 32-byte swap secret that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    inner: [u8; SECRET_LEN],
}

impl Secret {
    /// Create a secret from bytes.
    pub fn new(bytes: [u8; SECRET_LEN]) -> Self {
        Self { inner: bytes }
    }

    /// Create from a slice, failing fast on the wrong length.
    pub fn from_slice(slice: &[u8]) -> Result<Self, ValidationError> {
        if slice.len() != SECRET_LEN {
            return Err(ValidationError::SecretLength {
                expected: SECRET_LEN,
                got: slice.len(),
            });
        }
        let mut inner = [0u8; SECRET_LEN];
        inner.copy_from_slice(slice);
        Ok(Self { inner })
    }

    /// Get the secret bytes.
    ///
    /// Avoid keeping references to the returned slice.
    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.inner
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.inner.ct_eq(&other.inner).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let encoded = Zeroizing::new(hex::encode(self.inner));
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        let mut bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        let secret = Self::from_slice(&bytes).map_err(serde::de::Error::custom);
        bytes.zeroize();
        secret
    }
}

/// SHA-256 commitment to a secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashLock(pub Hash);

impl HashLock {
    /// SHA-256 of the secret. Matches the script ledger's `OP_SHA256`.
    pub fn commit(secret: &Secret) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Constant-time check that `secret` opens this lock.
    pub fn matches(&self, secret: &Secret) -> bool {
        Self::commit(secret).0.ct_eq(&self.0).into()
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Debug for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashLock(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

/// Write-once holder of the swap secret.
///
/// The secret leaves the vault only against a [`DestinationFunded`]
/// proof, or once it is already public on chain.
pub struct SecretVault {
    secret: Secret,
    hash_lock: HashLock,
    released: bool,
}

impl SecretVault {
    /// Seal a secret.
    pub fn new(secret: Secret) -> Self {
        let hash_lock = HashLock::commit(&secret);
        Self {
            secret,
            hash_lock,
            released: false,
        }
    }

    /// Commitment of the sealed secret.
    pub fn hash_lock(&self) -> HashLock {
        self.hash_lock
    }

    /// Release the secret for the source withdrawal.
    pub fn release(&mut self, proof: DestinationFunded) -> &Secret {
        if !self.released {
            info!(
                "[swap] Releasing secret for {}: destination {} confirmed funded",
                self.hash_lock,
                proof.escrow_ref()
            );
            self.released = true;
        }
        &self.secret
    }

    /// Record a secret observed in a confirmed withdrawal event.
    pub fn accept_public(&mut self, observed: &Secret) -> Result<(), SwapError> {
        if !self.hash_lock.matches(observed) {
            return Err(SwapError::InvalidSecret);
        }
        self.released = true;
        Ok(())
    }

    /// The secret, once released. `None` before destination funding.
    pub fn revealed(&self) -> Option<&Secret> {
        self.released.then_some(&self.secret)
    }

    /// Whether the secret has left the vault.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVault")
            .field("hash_lock", &self.hash_lock)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::escrow::test_support::funded_escrow;
    use crate::domain::value_objects::{LedgerKind, Side};

    #[test]
    fn test_secret_creation() {
        let secret = Secret::new([0xABu8; 32]);
        assert_eq!(secret.as_bytes()[0], 0xAB);
    }

    #[test]
    fn test_secret_debug_hides_value() {
        let secret = Secret::new([0xABu8; 32]);
        let debug_str = format!("{:?}", secret);
        assert!(!debug_str.to_lowercase().contains("ab"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn test_secret_from_slice() {
        let bytes = [0xCDu8; 32];
        let secret = Secret::from_slice(&bytes).unwrap();
        assert_eq!(secret.as_bytes(), &bytes);
    }

    #[test]
    fn test_secret_from_slice_wrong_length() {
        let err = Secret::from_slice(&[0xCDu8; 16]).unwrap_err();
        assert_eq!(err, ValidationError::SecretLength { expected: 32, got: 16 });
    }

    #[test]
    fn test_secret_serde_hex() {
        let secret = Secret::new([0x11u8; 32]);
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        let back: Secret = serde_json::from_str(&json).unwrap();
        assert_eq!(back, secret);
    }

    #[test]
    fn test_hashlock_known_vector() {
        // sha256 of 32 zero bytes
        let lock = HashLock::commit(&Secret::new([0u8; 32]));
        assert_eq!(
            hex::encode(lock.0),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
    }

    #[test]
    fn test_hashlock_matches() {
        let secret = Secret::new([0x33u8; 32]);
        let lock = HashLock::commit(&secret);
        assert!(lock.matches(&secret));
        assert!(!lock.matches(&Secret::new([0x34u8; 32])));
    }

    #[test]
    fn test_secret_deserialize_rejects_short() {
        let result: Result<Secret, _> = serde_json::from_str("\"abcd\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_vault_withholds_until_destination_funded() {
        let secret = Secret::new([0x55u8; 32]);
        let mut vault = SecretVault::new(secret.clone());
        assert!(vault.revealed().is_none());

        let source = funded_escrow(Side::Source, LedgerKind::Contract, &secret);
        assert!(source.destination_funded().is_none());
        assert!(vault.revealed().is_none());

        let destination = funded_escrow(Side::Destination, LedgerKind::Contract, &secret);
        let proof = destination.destination_funded().unwrap();
        assert_eq!(vault.release(proof), &secret);
        assert_eq!(vault.revealed(), Some(&secret));
    }

    #[test]
    fn test_vault_accept_public_checks_hashlock() {
        let secret = Secret::new([0x56u8; 32]);
        let mut vault = SecretVault::new(secret.clone());
        assert!(matches!(
            vault.accept_public(&Secret::new([0x57u8; 32])),
            Err(SwapError::InvalidSecret)
        ));
        assert!(!vault.is_released());
        vault.accept_public(&secret).unwrap();
        assert!(vault.is_released());
    }
}
