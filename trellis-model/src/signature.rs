//! Transaction signatures with metadata.
//!
//! A [`TransactionSignature`] binds an Ed25519 signature to a transaction
//! digest *and* protocol metadata. The signed payload is the canonical
//! Borsh encoding of `(digest, metadata)`, never the digest alone: signing
//! the bare digest would let an attacker re-present the same signature
//! under different metadata.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::crypto::{self, SignatureError};
use crate::types::{Hash, PubKey, Signature};

/// Metadata bound into every transaction signature.
///
/// Currently carries the platform (protocol) version the signer was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct SignatureMetadata {
    pub platform_version: u32,
}

impl SignatureMetadata {
    pub fn new(platform_version: u32) -> Self {
        SignatureMetadata { platform_version }
    }
}

/// The canonical signable payload: a transaction digest plus metadata.
///
/// Borsh field order is the wire contract; independent implementations must
/// produce identical bytes for identical content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
struct SignableData {
    digest: Hash,
    metadata: SignatureMetadata,
}

impl SignableData {
    fn to_borsh(self) -> Vec<u8> {
        borsh::to_vec(&self).expect("borsh serialization cannot fail")
    }
}

/// A digital signature accompanied by the signer's key and the metadata it
/// was bound to. Equality and hashing are structural over all three fields.
///
/// The signature bytes are kept as a raw vector so that malformed input
/// from a peer is representable and rejected at verification time
/// ([`SignatureError::InvalidInput`]) rather than at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct TransactionSignature {
    /// Raw Ed25519 signature bytes (64 when well-formed).
    pub bytes: Vec<u8>,
    /// The public key of the signer.
    pub by: PubKey,
    /// The metadata bound into the signed payload.
    pub metadata: SignatureMetadata,
}

impl TransactionSignature {
    /// Sign `(digest, metadata)` with the given key.
    pub fn sign(
        signing_key: &ed25519_dalek::SigningKey,
        digest: Hash,
        metadata: SignatureMetadata,
    ) -> Self {
        let payload = SignableData { digest, metadata }.to_borsh();
        let signature = crypto::sign_bytes(signing_key, &payload);
        TransactionSignature {
            bytes: signature.0.to_vec(),
            by: crypto::public_key(signing_key),
            metadata,
        }
    }

    /// Verify this signature against a transaction digest.
    ///
    /// The payload is re-encoded from `(digest, self.metadata)`, so a
    /// signature made under different metadata fails even for the same
    /// digest.
    pub fn verify(&self, digest: Hash) -> Result<(), SignatureError> {
        if self.bytes.is_empty() {
            return Err(SignatureError::InvalidInput(
                "empty signature bytes".into(),
            ));
        }
        let raw: [u8; 64] = self.bytes.as_slice().try_into().map_err(|_| {
            SignatureError::InvalidInput(format!(
                "expected 64 signature bytes, got {}",
                self.bytes.len()
            ))
        })?;
        let payload = SignableData {
            digest,
            metadata: self.metadata,
        }
        .to_borsh();
        crypto::verify_bytes_strict(&self.by, &payload, &Signature(raw))
    }

    /// Like [`verify`](Self::verify), but reports cryptographic mismatch as
    /// `false` instead of an error. Structural problems (bad key, malformed
    /// signature bytes) still surface as errors.
    pub fn is_valid(&self, digest: Hash) -> Result<bool, SignatureError> {
        match self.verify(digest) {
            Ok(()) => Ok(true),
            Err(SignatureError::SignatureMismatch) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> ed25519_dalek::SigningKey {
        ed25519_dalek::SigningKey::from_bytes(&[seed; 32])
    }

    fn meta() -> SignatureMetadata {
        SignatureMetadata::new(4)
    }

    #[test]
    fn sign_and_verify() {
        let digest = Hash([7u8; 32]);
        let sig = TransactionSignature::sign(&key(1), digest, meta());
        assert!(sig.verify(digest).is_ok());
        assert_eq!(sig.is_valid(digest), Ok(true));
    }

    #[test]
    fn rejects_different_digest() {
        let sig = TransactionSignature::sign(&key(1), Hash([7u8; 32]), meta());
        assert_eq!(sig.is_valid(Hash([8u8; 32])), Ok(false));
    }

    #[test]
    fn rejects_metadata_substitution() {
        let digest = Hash([7u8; 32]);
        let mut sig = TransactionSignature::sign(&key(1), digest, meta());
        // Same signature re-presented under different metadata must fail.
        sig.metadata = SignatureMetadata::new(5);
        assert_eq!(sig.is_valid(digest), Ok(false));
    }

    #[test]
    fn rejects_wrong_key() {
        let digest = Hash([7u8; 32]);
        let mut sig = TransactionSignature::sign(&key(1), digest, meta());
        sig.by = crypto::public_key(&key(2));
        assert_eq!(sig.is_valid(digest), Ok(false));
    }

    #[test]
    fn empty_bytes_is_invalid_input() {
        let digest = Hash([7u8; 32]);
        let mut sig = TransactionSignature::sign(&key(1), digest, meta());
        sig.bytes.clear();
        assert!(matches!(
            sig.verify(digest),
            Err(SignatureError::InvalidInput(_))
        ));
    }

    #[test]
    fn truncated_bytes_is_invalid_input() {
        let digest = Hash([7u8; 32]);
        let mut sig = TransactionSignature::sign(&key(1), digest, meta());
        sig.bytes.truncate(10);
        assert!(matches!(
            sig.verify(digest),
            Err(SignatureError::InvalidInput(_))
        ));
    }

    #[test]
    fn equality_is_structural() {
        let digest = Hash([7u8; 32]);
        let a = TransactionSignature::sign(&key(1), digest, meta());
        let b = TransactionSignature::sign(&key(1), digest, meta());
        assert_eq!(a, b);
        let c = TransactionSignature::sign(&key(1), digest, SignatureMetadata::new(9));
        assert_ne!(a, c);
    }
}
