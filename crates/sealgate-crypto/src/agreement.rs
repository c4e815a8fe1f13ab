//! Elliptic-curve key agreement on the fixed protocol curve
//!
//! The curve (NIST P-384) and the public-key encoding (SEC1 uncompressed,
//! 97 bytes) are protocol constants. Both ends must use the identical curve
//! and encoding or the scheme is undefined.

use p384::{
    PublicKey, SecretKey, ecdh,
    elliptic_curve::sec1::ToEncodedPoint,
};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use crate::errors::CryptoError;

/// Canonical encoded public key length: SEC1 uncompressed point on P-384
/// (`0x04 ‖ X ‖ Y`, 1 + 48 + 48 bytes)
pub const SESSION_PUBLIC_KEY_LEN: usize = 97;

/// SEC1 uncompressed point tag
const UNCOMPRESSED_TAG: u8 = 0x04;

/// A public key on the protocol curve.
///
/// Used both for a peer's long-lived session key and for the per-message
/// ephemeral key transported in the encryption context - each is the other
/// half of one ECDH agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPublicKey(PublicKey);

impl SessionPublicKey {
    /// Decode a public key from its canonical SEC1 uncompressed form.
    ///
    /// # Errors
    ///
    /// `InvalidSessionKey` if the bytes are not exactly 97 bytes of
    /// uncompressed encoding, or do not decode to a valid point on P-384.
    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SESSION_PUBLIC_KEY_LEN || bytes[0] != UNCOMPRESSED_TAG {
            return Err(CryptoError::InvalidSessionKey);
        }
        PublicKey::from_sec1_bytes(bytes).map(Self).map_err(|_| CryptoError::InvalidSessionKey)
    }

    /// Canonical SEC1 uncompressed encoding. Round-trips byte-exact with
    /// [`Self::decode`].
    pub fn encode(&self) -> [u8; SESSION_PUBLIC_KEY_LEN] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; SESSION_PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }
}

/// Shared secret produced by ECDH agreement.
///
/// Exists only transiently during key setup; zeroized on drop, never
/// persisted or transmitted.
pub struct SharedSecret {
    bytes: [u8; 48],
}

impl SharedSecret {
    fn from_agreement(secret: &ecdh::SharedSecret) -> Self {
        let mut bytes = [0u8; 48];
        bytes.copy_from_slice(secret.raw_secret_bytes());
        Self { bytes }
    }

    /// Raw agreement output (the x-coordinate, 48 bytes on P-384).
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.bytes
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Ephemeral per-message key pair.
///
/// Generated once per `Encrypter` instance and never reused across
/// messages. Only the public half ever leaves this type.
pub struct MessageKeyPair {
    secret: SecretKey,
    public: SessionPublicKey,
}

impl MessageKeyPair {
    /// Generate a fresh ephemeral pair from the injected RNG.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let secret = SecretKey::random(rng);
        let public = SessionPublicKey(secret.public_key());
        Self { secret, public }
    }

    /// Public half, for transport inside the encryption context.
    pub fn public(&self) -> &SessionPublicKey {
        &self.public
    }

    /// Compute the shared secret with a peer public key.
    pub fn agree(&self, peer: &SessionPublicKey) -> SharedSecret {
        SharedSecret::from_agreement(&ecdh::diffie_hellman(
            self.secret.to_nonzero_scalar(),
            peer.0.as_affine(),
        ))
    }
}

/// Long-lived session key pair (receiver side, supplied by the key store).
pub struct SessionKeyPair {
    secret: SecretKey,
    public: SessionPublicKey,
}

impl SessionKeyPair {
    /// Generate a new session pair from the injected RNG.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let secret = SecretKey::random(rng);
        let public = SessionPublicKey(secret.public_key());
        Self { secret, public }
    }

    /// Public half, distributed to senders out of band.
    pub fn public(&self) -> &SessionPublicKey {
        &self.public
    }

    /// Compute the shared secret with a sender's ephemeral public key.
    pub fn agree(&self, peer: &SessionPublicKey) -> SharedSecret {
        SharedSecret::from_agreement(&ecdh::diffie_hellman(
            self.secret.to_nonzero_scalar(),
            peer.0.as_affine(),
        ))
    }
}
