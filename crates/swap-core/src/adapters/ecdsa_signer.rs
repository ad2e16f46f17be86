//! secp256k1 Order Signer
//!
//! Implements `OrderSigner` with recoverable ECDSA over a 32-byte
//! prehash. Addresses are the last 20 bytes of keccak256 of the
//! uncompressed public key, as on Ethereum.

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::domain::{keccak256, Address, Hash, Signature, SwapError, ValidationError};
use crate::ports::outbound::OrderSigner;

/// Order signer holding one secp256k1 key.
pub struct EcdsaOrderSigner {
    signing_key: SigningKey,
    address: Address,
}

impl EcdsaOrderSigner {
    /// Load a 32-byte private key.
    pub fn from_bytes(key: &[u8]) -> Result<Self, SwapError> {
        let signing_key = SigningKey::from_slice(key)
            .map_err(|_| ValidationError::InvalidConfig("invalid secp256k1 private key".to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Load a hex-encoded private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self, SwapError> {
        let mut bytes = hex::decode(key.trim_start_matches("0x"))
            .map_err(|_| ValidationError::InvalidConfig("private key is not hex".to_string()))?;
        let signer = Self::from_bytes(&bytes);
        bytes.zeroize();
        signer
    }

    /// Fresh random key.
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_from_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }
}

fn address_from_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, ValidationError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(ValidationError::InvalidSignature),
    };
    RecoveryId::try_from(id).map_err(|_| ValidationError::InvalidSignature)
}

#[async_trait]
impl OrderSigner for EcdsaOrderSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, digest: &Hash) -> Result<Signature, SwapError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|_| ValidationError::InvalidSignature)?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Signature {
            r,
            s,
            v: recovery_id.to_byte() + 27,
        })
    }

    fn recover(&self, digest: &Hash, signature: &Signature) -> Result<Address, SwapError> {
        let recovery_id = parse_recovery_id(signature.v)?;
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&signature.r);
        bytes[32..].copy_from_slice(&signature.s);
        let parsed =
            EcdsaSignature::from_slice(&bytes).map_err(|_| ValidationError::InvalidSignature)?;
        let key = VerifyingKey::recover_from_prehash(digest, &parsed, recovery_id)
            .map_err(|_| ValidationError::InvalidSignature)?;
        Ok(address_from_key(&key))
    }
}
