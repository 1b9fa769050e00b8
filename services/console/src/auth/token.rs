//! Session JWT minting and verification.
//!
//! # Purpose
//! Define claim structures and helpers for signing/verifying the console's
//! session tokens. The token subject is the user id; roles and permissions
//! are deliberately *not* embedded, because the guard reloads them from the
//! store on every request so RBAC changes (and soft deletes) take effect
//! immediately.
//!
//! # Key invariants
//! - Session tokens are always EdDSA (Ed25519), never RSA/HS variants.
//! - `iss` and `aud` claims are mandatory and validated.
//! - The private key is a 32-byte Ed25519 seed; the public key must match it.
//!
//! # Security model and threat assumptions
//! - Attackers may supply arbitrary JWTs; we validate algorithm, issuer, and
//!   audience before accepting.
//! - Key IDs (`kid`) support rotation and are not secrets.
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

pub const ISSUER: &str = "warden-auth";
pub const AUDIENCE: &str = "warden-console";

const ED25519_KEY_LEN: usize = 32;

/// Claims carried by console-issued session JWTs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    /// User id as a UUID string.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    /// Parse the subject claim back into a user id.
    pub fn subject(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|err| TokenError::Key(format!("invalid subject: {err}")))
    }
}

/// Ed25519 signing key material.
#[derive(Debug, Clone)]
pub struct SigningKey {
    pub kid: String,
    /// Raw 32-byte Ed25519 seed; must not be logged.
    pub private_key: [u8; ED25519_KEY_LEN],
    pub public_key: [u8; ED25519_KEY_LEN],
}

impl SigningKey {
    /// Confirm the public key matches the private seed. Guards against
    /// corrupted storage or a mispasted seed.
    pub fn validate(&self) -> Result<(), TokenError> {
        let signing_key = Ed25519SigningKey::from_bytes(&self.private_key);
        let expected = signing_key.verifying_key().to_bytes();
        if expected != self.public_key {
            return Err(TokenError::Key(
                "Ed25519 public key does not match private seed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Current and previous signing keys; previous keys still verify existing
/// tokens during rotation.
#[derive(Debug, Clone)]
pub struct SigningKeys {
    pub current: SigningKey,
    pub previous: Vec<SigningKey>,
}

impl SigningKeys {
    pub fn validate(&self) -> Result<(), TokenError> {
        self.current.validate()?;
        for key in &self.previous {
            key.validate()?;
        }
        Ok(())
    }

    /// Current key first; ordering matters when trying keys for verification.
    pub fn all_keys(&self) -> impl Iterator<Item = &SigningKey> {
        std::iter::once(&self.current).chain(self.previous.iter())
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("key error: {0}")]
    Key(String),
}

/// Mint a session token for a user.
///
/// # Errors
/// - `TokenError::Key` if key validation fails.
/// - `TokenError::Jwt` if encoding fails.
pub fn mint_token(keys: &SigningKeys, user_id: Uuid, ttl: Duration) -> Result<String, TokenError> {
    keys.validate()?;
    let now = now_epoch_seconds();
    let claims = SessionClaims {
        iss: ISSUER.to_string(),
        aud: AUDIENCE.to_string(),
        sub: user_id.to_string(),
        exp: now + ttl.as_secs() as i64,
        iat: now,
    };

    // Embed the current `kid` so verification can pick the right key first
    // during rotation.
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(keys.current.kid.clone());
    let encoding_key = encoding_key(&keys.current)?;
    Ok(jsonwebtoken::encode(&header, &claims, &encoding_key)?)
}

/// Verify a session token against the service signing keys.
///
/// Validates algorithm, issuer, and audience, trying the `kid`-named key
/// first and falling back to the remaining keys.
pub fn verify_token(
    keys: &SigningKeys,
    token: &str,
    leeway: u64,
) -> Result<SessionClaims, TokenError> {
    keys.validate()?;
    let header = jsonwebtoken::decode_header(token)?;
    let mut ordered_keys = Vec::new();
    if let Some(kid) = header.kid.as_deref()
        && let Some(found) = keys.all_keys().find(|entry| entry.kid == kid)
    {
        ordered_keys.push(found);
        for entry in keys.all_keys() {
            if entry.kid != kid {
                ordered_keys.push(entry);
            }
        }
    } else {
        ordered_keys.extend(keys.all_keys());
    }

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_audience(&[AUDIENCE]);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = leeway;

    let mut last_err = None;
    for key in ordered_keys {
        let decoding_key = decoding_key(key)?;
        match jsonwebtoken::decode::<SessionClaims>(token, &decoding_key, &validation) {
            Ok(token) => return Ok(token.claims),
            Err(err) => last_err = Some(err),
        }
    }
    // Return the last JWT error to preserve the root cause in telemetry.
    Err(TokenError::Jwt(last_err.unwrap_or_else(|| {
        jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken)
    })))
}

fn encoding_key(key: &SigningKey) -> Result<EncodingKey, TokenError> {
    // jsonwebtoken expects PKCS8 DER for EdDSA; storage keeps raw seeds.
    let signing_key = Ed25519SigningKey::from_bytes(&key.private_key);
    let der = signing_key
        .to_pkcs8_der()
        .map_err(|err| TokenError::Key(format!("encode Ed25519 key: {err}")))?;
    Ok(EncodingKey::from_ed_der(der.as_bytes()))
}

fn decoding_key(key: &SigningKey) -> Result<DecodingKey, TokenError> {
    // EdDSA decoding keys are built from the base64url `x` JWK component.
    let x = URL_SAFE_NO_PAD.encode(key.public_key);
    DecodingKey::from_ed_components(&x).map_err(TokenError::Jwt)
}

fn now_epoch_seconds() -> i64 {
    // Wall-clock time; verification allows leeway for skew. Clamp a
    // backwards-skewed clock to zero instead of panicking.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::keys_from_seed;

    fn signing_keys() -> SigningKeys {
        keys_from_seed(&[5u8; 32])
    }

    #[test]
    fn mint_verify_round_trip() {
        let keys = signing_keys();
        let user_id = Uuid::new_v4();
        let token = mint_token(&keys, user_id, Duration::from_secs(900)).expect("mint");
        let claims = verify_token(&keys, &token, 5).expect("verify");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.subject().expect("subject"), user_id);
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let keys = signing_keys();
        let other = keys_from_seed(&[9u8; 32]);
        let token = mint_token(&other, Uuid::new_v4(), Duration::from_secs(900)).expect("mint");
        assert!(verify_token(&keys, &token, 5).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = signing_keys();
        // Sign a claim set that expired an hour ago.
        let now = now_epoch_seconds();
        let claims = SessionClaims {
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            sub: Uuid::new_v4().to_string(),
            exp: now - 3600,
            iat: now - 7200,
        };
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(keys.current.kid.clone());
        let key = encoding_key(&keys.current).expect("key");
        let token = jsonwebtoken::encode(&header, &claims, &key).expect("encode");

        assert!(verify_token(&keys, &token, 0).is_err());
    }

    #[test]
    fn rotated_previous_key_still_verifies() {
        let old = keys_from_seed(&[1u8; 32]);
        let token = mint_token(&old, Uuid::new_v4(), Duration::from_secs(900)).expect("mint");

        let rotated = SigningKeys {
            current: keys_from_seed(&[2u8; 32]).current,
            previous: vec![old.current],
        };
        verify_token(&rotated, &token, 5).expect("verify with previous key");
    }

    #[test]
    fn mismatched_key_material_is_rejected() {
        let mut keys = signing_keys();
        keys.current.public_key = [0u8; 32];
        let err = mint_token(&keys, Uuid::new_v4(), Duration::from_secs(60)).expect_err("invalid");
        assert!(matches!(err, TokenError::Key(_)));
    }
}
