//! Centralized cryptographic operations for Trellis.
//!
//! **All** Ed25519 signing, verification, BLAKE3 hashing, and secret
//! generation go through this module. This provides a single audit surface
//! for cryptographic correctness.
//!
//! # Primitives
//!
//! | Primitive   | Algorithm       | Purpose                                     |
//! |-------------|-----------------|---------------------------------------------|
//! | Hash        | BLAKE3 (32 B)   | Transaction ids, attachment ids, state refs |
//! | Signature   | Ed25519 (64 B)  | Transaction signatures (with metadata)      |
//! | Identity    | Ed25519 keypair | Signer, peer and notary identity            |

use crate::types::{Hash, PubKey, Signature};

// ---------------------------------------------------------------------------
// Content hashing (BLAKE3)
// ---------------------------------------------------------------------------

/// Compute the BLAKE3 content hash of arbitrary bytes.
///
/// Used for: transaction ids (over the canonical Borsh encoding) and
/// attachment ids (over the raw blob).
#[inline]
pub fn content_hash(data: &[u8]) -> Hash {
    Hash(*blake3::hash(data).as_bytes())
}

// ---------------------------------------------------------------------------
// Ed25519 signing
// ---------------------------------------------------------------------------

/// Sign a message with an Ed25519 signing key.
pub fn sign_bytes(signing_key: &ed25519_dalek::SigningKey, message: &[u8]) -> Signature {
    use ed25519_dalek::Signer;
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// The public key of a signing key, as a [`PubKey`].
pub fn public_key(signing_key: &ed25519_dalek::SigningKey) -> PubKey {
    PubKey(signing_key.verifying_key().to_bytes())
}

// ---------------------------------------------------------------------------
// Ed25519 verification
// ---------------------------------------------------------------------------

/// Verify an Ed25519 signature over a message (strict).
///
/// Uses `verify_strict()` (rejects small-order keys, checks canonical S).
/// All transaction signature checks use this path.
pub fn verify_bytes_strict(
    pubkey: &PubKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignatureError> {
    let vk = verifying_key(pubkey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(message, &sig)
        .map_err(|_| SignatureError::SignatureMismatch)
}

/// Deserialize a `PubKey` into an Ed25519 `VerifyingKey`.
///
/// Fails if the 32 bytes are not a valid curve point.
pub fn verifying_key(pubkey: &PubKey) -> Result<ed25519_dalek::VerifyingKey, SignatureError> {
    ed25519_dalek::VerifyingKey::from_bytes(&pubkey.0).map_err(|_| SignatureError::InvalidKey)
}

// ---------------------------------------------------------------------------
// Secret generation (CSPRNG)
// ---------------------------------------------------------------------------

/// Generate 32 bytes of cryptographically secure randomness.
///
/// Used for: fresh signing keys, test key material.
pub fn generate_secret() -> [u8; 32] {
    use rand::RngCore;
    let mut secret = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    secret
}

/// Generate a fresh Ed25519 signing key.
pub fn generate_signing_key() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::from_bytes(&generate_secret())
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Signature verification error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The claimed public key is not structurally valid for Ed25519.
    #[error("invalid Ed25519 public key")]
    InvalidKey,

    /// The key is valid but cryptographic verification failed.
    #[error("signature did not match the signed data")]
    SignatureMismatch,

    /// The signature bytes themselves are empty or malformed.
    #[error("malformed signature input: {0}")]
    InvalidInput(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
