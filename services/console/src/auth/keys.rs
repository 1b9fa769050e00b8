//! Signing key generation for console session JWTs.
//!
//! # Purpose
//! Produce the service's Ed25519 signing keys, either freshly generated (dev
//! deployments, where tokens die with the process) or derived from the
//! configured seed so restarts keep existing sessions valid.
//!
//! # Key invariants
//! - Keys are always Ed25519; the private key is a raw 32-byte seed and the
//!   public key is derived from it to avoid mismatches.
//! - Private key material must never be logged.
use crate::auth::token::{SigningKey, SigningKeys};
use anyhow::Result;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use rand::RngCore;

/// Generate a fresh random signing key set.
///
/// The `kid` is random and not a secret; it lets verification pick the right
/// key during rotation.
pub fn generate_signing_keys() -> Result<SigningKeys> {
    let mut private_key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut private_key);

    let mut kid_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut kid_bytes);

    Ok(build(private_key, hex::encode(kid_bytes)))
}

/// Derive the signing key set from a fixed 32-byte seed.
///
/// Deterministic: the same seed always yields the same key pair and `kid`,
/// which is what keeps sessions valid across restarts.
pub fn keys_from_seed(seed: &[u8; 32]) -> SigningKeys {
    let signing_key = Ed25519SigningKey::from_bytes(seed);
    let public_key = signing_key.verifying_key().to_bytes();
    // kid from the public half only; never derived from the seed directly.
    let kid = hex::encode(&public_key[..8]);
    build(*seed, kid)
}

fn build(private_key: [u8; 32], kid: String) -> SigningKeys {
    let signing_key = Ed25519SigningKey::from_bytes(&private_key);
    SigningKeys {
        current: SigningKey {
            kid,
            private_key,
            public_key: signing_key.verifying_key().to_bytes(),
        },
        previous: Vec::new(),
    }
}
