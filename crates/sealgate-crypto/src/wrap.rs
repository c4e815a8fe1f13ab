//! Asymmetric and symmetric wrapping of transported key material
//!
//! RSA-OAEP protects short fixed-length secrets (a salt plus the sender's
//! ephemeral public key) or double-wraps an already AES-wrapped blob. The
//! AES key wrap (RFC 3394) carries payload (key, IV) blobs under a derived
//! key-encryption key.

use aes_kw::KekAes256;
use rand_core::CryptoRngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts};
use sha2::Sha256;

use crate::errors::CryptoError;

/// Smallest accepted RSA modulus (bits)
pub const MIN_RSA_BITS: usize = 2048;

/// Largest accepted RSA modulus (bits)
pub const MAX_RSA_BITS: usize = 4096;

/// AES key wrap adds one 8-byte integrity block
const KEY_WRAP_OVERHEAD: usize = 8;

fn check_modulus(bytes: usize) -> Result<(), CryptoError> {
    let bits = bytes * 8;
    if (MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
        Ok(())
    } else {
        Err(CryptoError::UnsupportedKeyType { modulus_bits: bits })
    }
}

/// RSA-OAEP wrap a short secret under the recipient's long-term key.
///
/// Output length equals the modulus byte length, which lets a decrypter
/// that knows the expected modulus validate context lengths strictly.
///
/// # Errors
///
/// - `UnsupportedKeyType` if the modulus is outside 2048-4096 bits
/// - `WrapFailed` if the plaintext exceeds the OAEP capacity
pub fn rsa_wrap(
    key: &RsaPublicKey,
    rng: &mut impl CryptoRngCore,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_modulus(key.size())?;
    key.encrypt(rng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CryptoError::WrapFailed { reason: e.to_string() })
}

/// RSA-OAEP unwrap with the local private key.
///
/// Unwrap failures on the decrypt path are reported as
/// `InvalidEncryptionContext`: a blob that does not unwrap is structurally
/// bad input, and nothing about the failure is allowed to leak further.
pub fn rsa_unwrap(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_modulus(key.size())?;
    key.decrypt(Oaep::new::<Sha256>(), ciphertext).map_err(|_| {
        CryptoError::InvalidEncryptionContext { reason: "asymmetric unwrap failed".to_string() }
    })
}

/// AES-256 key wrap (RFC 3394) under a derived key-encryption key.
///
/// Input must be a multiple of 8 bytes and at least 16 - true for every
/// blob this protocol wraps (48, 96, or a full RSA block).
pub fn aes_wrap(kek: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() % 8 != 0 || blob.len() < 16 {
        return Err(CryptoError::WrapFailed {
            reason: format!("key wrap input must be 8-byte aligned, got {}", blob.len()),
        });
    }
    let kek = KekAes256::new(kek.into());
    let mut out = vec![0u8; blob.len() + KEY_WRAP_OVERHEAD];
    kek.wrap(blob, &mut out)
        .map_err(|e| CryptoError::WrapFailed { reason: e.to_string() })?;
    Ok(out)
}

/// AES-256 key unwrap. Integrity-check failure means the context (or the
/// derived KEK, and therefore the passphrase or agreement) is wrong.
pub fn aes_unwrap(kek: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() % 8 != 0 || blob.len() < 16 + KEY_WRAP_OVERHEAD {
        return Err(CryptoError::InvalidEncryptionContext {
            reason: format!("wrapped key blob has invalid length {}", blob.len()),
        });
    }
    let kek = KekAes256::new(kek.into());
    let mut out = vec![0u8; blob.len() - KEY_WRAP_OVERHEAD];
    kek.unwrap(blob, &mut out).map_err(|_| CryptoError::InvalidEncryptionContext {
        reason: "symmetric key unwrap failed".to_string(),
    })?;
    Ok(out)
}
