//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports: a simulated ledger, a
//! secp256k1 order signer, a nonce registry and a file handoff store.

mod ecdsa_signer;
mod handoff_store;
mod in_memory_chain;
mod in_memory_settlement;

pub use ecdsa_signer::EcdsaOrderSigner;
pub use handoff_store::FileHandoffStore;
pub use in_memory_chain::{InMemoryChain, MAX_DEPLOY_DRIFT_SECS, NATIVE_ASSET};
pub use in_memory_settlement::InMemorySettlement;
