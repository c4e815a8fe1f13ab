//! One-shot key derivation: `KDF(parts) = SHA-384(concat(parts))`
//!
//! The 48-byte digest output is sliced left-to-right into successive
//! (key, IV) pairs by the consuming cipher specs. A scheme that demands
//! more bytes than a derivation supplies is misconfigured; the slicer
//! reports that at scheme construction instead of truncating.

use sha2::{Digest, Sha384};
use zeroize::Zeroize;

use crate::errors::CryptoError;

/// Output width of the protocol KDF digest (SHA-384)
pub const DERIVED_LEN: usize = 48;

/// Derive key material from concatenated byte strings.
///
/// Deterministic: the same parts in the same order always produce the same
/// output. Sender and receiver must feed the identical part sequence
/// (encoded session public key, shared secret, then the scheme's mixing
/// factors) or the derived keys diverge.
pub fn derive(parts: &[&[u8]]) -> [u8; DERIVED_LEN] {
    let mut hasher = Sha384::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Digest of the pre-shared passphrase, as mixed into passphrase-augmented
/// derivations.
pub fn digest_passphrase(passphrase: &[u8]) -> [u8; DERIVED_LEN] {
    derive(&[passphrase])
}

/// Byte-interleave a derivation output with a same-width salt.
///
/// Used by the cascade sub-variant of the salted RSA+ECDH scheme to stretch
/// one 48-byte derivation into the 96 bytes two cipher (key, IV) pairs
/// need: output is `d[0] s[0] d[1] s[1] ...`.
pub fn interleave(derived: &[u8; DERIVED_LEN], salt: &[u8; DERIVED_LEN]) -> [u8; 2 * DERIVED_LEN] {
    let mut out = [0u8; 2 * DERIVED_LEN];
    for i in 0..DERIVED_LEN {
        out[2 * i] = derived[i];
        out[2 * i + 1] = salt[i];
    }
    out
}

/// Left-to-right slicer over derived key material.
///
/// Each [`take`](Self::take) consumes the next `len` bytes. The backing
/// bytes are zeroized when the slicer is dropped.
pub struct KeyMaterial {
    bytes: Vec<u8>,
    offset: usize,
}

impl KeyMaterial {
    /// Wrap derivation output for slicing.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Consume the next `len` bytes.
    ///
    /// # Errors
    ///
    /// `KeyMaterialExhausted` if fewer than `len` bytes remain. The caller
    /// must treat this as a scheme configuration error, not truncate.
    pub fn take(&mut self, len: usize) -> Result<&[u8], CryptoError> {
        if len > self.remaining() {
            return Err(CryptoError::KeyMaterialExhausted {
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
