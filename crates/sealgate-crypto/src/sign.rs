//! Detached streaming signatures with explicit length binding
//!
//! The signature covers `plaintext ‖ len8` where `len8` is the 8-byte
//! big-endian plaintext length also declared in the encryption context.
//! Binding the length defeats truncation and extension attacks that a bare
//! detached signature over the stream alone would not catch.
//!
//! Signing is streaming: bytes are folded into a SHA-512 prehash as they
//! pass, and the Ed25519ph signature is produced at close without ever
//! buffering the plaintext.

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha512};

use crate::errors::CryptoError;

/// Detached signature length (Ed25519)
pub const SIGNATURE_LEN: usize = 64;

/// Accumulates the signing prehash over a plaintext stream.
pub struct StreamSigner {
    prehash: Sha512,
    count: u64,
}

impl StreamSigner {
    /// Start a signer for one plaintext stream.
    pub fn new() -> Self {
        Self { prehash: Sha512::new(), count: 0 }
    }

    /// Fold written plaintext bytes into the prehash.
    pub fn update(&mut self, bytes: &[u8]) {
        self.prehash.update(bytes);
        self.count += bytes.len() as u64;
    }

    /// Plaintext bytes observed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Close the stream: append the 8-byte big-endian length to the prehash
    /// and produce the detached signature.
    pub fn finalize(mut self, key: &SigningKey) -> [u8; SIGNATURE_LEN] {
        self.prehash.update(self.count.to_be_bytes());
        let Ok(signature) = key.sign_prehashed(self.prehash, None) else {
            unreachable!("Ed25519ph signing without a context string cannot fail");
        };
        signature.to_bytes()
    }
}

impl Default for StreamSigner {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies a detached signature as a plaintext stream is consumed.
pub struct StreamVerifier {
    prehash: Sha512,
    observed: u64,
    declared: u64,
}

impl StreamVerifier {
    /// Start a verifier for a stream whose length was declared in the
    /// encryption context.
    pub fn new(declared: u64) -> Self {
        Self { prehash: Sha512::new(), observed: 0, declared }
    }

    /// Fold observed plaintext bytes into the prehash.
    pub fn update(&mut self, bytes: &[u8]) {
        self.prehash.update(bytes);
        self.observed += bytes.len() as u64;
    }

    /// Plaintext bytes observed so far.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Declared plaintext length being verified against.
    pub fn declared(&self) -> u64 {
        self.declared
    }

    /// Close the stream and verify.
    ///
    /// # Errors
    ///
    /// - `LengthMismatch` if the observed byte count differs from the
    ///   declared length
    /// - `SignatureInvalid` if the trailing signature does not verify over
    ///   the observed bytes and declared length
    pub fn finish(
        mut self,
        key: &VerifyingKey,
        signature: &[u8; SIGNATURE_LEN],
    ) -> Result<(), CryptoError> {
        if self.observed != self.declared {
            return Err(CryptoError::LengthMismatch {
                declared: self.declared,
                observed: self.observed,
            });
        }
        self.prehash.update(self.declared.to_be_bytes());
        key.verify_prehashed(self.prehash, None, &Signature::from_bytes(signature))
            .map_err(|_| CryptoError::SignatureInvalid)
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    use super::*;

    fn keys() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::generate(&mut ChaCha20Rng::seed_from_u64(5));
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    fn sign_all(key: &SigningKey, chunks: &[&[u8]]) -> [u8; SIGNATURE_LEN] {
        let mut signer = StreamSigner::new();
        for chunk in chunks {
            signer.update(chunk);
        }
        signer.finalize(key)
    }

    #[test]
    fn sign_verify_round_trip() {
        let (signing, verifying) = keys();
        let signature = sign_all(&signing, &[b"hello ", b"world"]);

        let mut verifier = StreamVerifier::new(11);
        verifier.update(b"hello world");
        verifier.finish(&verifying, &signature).unwrap();
    }

    #[test]
    fn empty_stream_verifies() {
        let (signing, verifying) = keys();
        let signature = sign_all(&signing, &[]);

        let verifier = StreamVerifier::new(0);
        verifier.finish(&verifying, &signature).unwrap();
    }

    #[test]
    fn chunking_does_not_change_the_signature() {
        let (signing, _) = keys();
        let one = sign_all(&signing, &[b"abcdef"]);
        let many = sign_all(&signing, &[b"ab", b"cd", b"ef"]);
        assert_eq!(one, many);
    }

    #[test]
    fn length_mismatch_detected_before_signature() {
        let (signing, verifying) = keys();
        let signature = sign_all(&signing, &[b"abcdef"]);

        let mut verifier = StreamVerifier::new(100);
        verifier.update(b"abcdef");
        let result = verifier.finish(&verifying, &signature);
        assert!(matches!(
            result,
            Err(CryptoError::LengthMismatch { declared: 100, observed: 6 })
        ));
    }

    #[test]
    fn altered_plaintext_fails_verification() {
        let (signing, verifying) = keys();
        let signature = sign_all(&signing, &[b"original"]);

        let mut verifier = StreamVerifier::new(8);
        verifier.update(b"0riginal");
        let result = verifier.finish(&verifying, &signature);
        assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
    }

    #[test]
    fn altered_signature_fails_verification() {
        let (signing, verifying) = keys();
        let mut signature = sign_all(&signing, &[b"payload"]);
        signature[0] ^= 0x80;

        let mut verifier = StreamVerifier::new(7);
        verifier.update(b"payload");
        let result = verifier.finish(&verifying, &signature);
        assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
    }

    #[test]
    fn length_trailer_changes_the_signature() {
        // Streams with identical byte content but different lengths cannot
        // share a signature: the 8-byte length trailer is part of the
        // prehash.
        let (signing, _) = keys();
        let over_four = sign_all(&signing, &[&[0u8; 4]]);
        let over_five = sign_all(&signing, &[&[0u8; 5]]);
        assert_ne!(over_four, over_five);
    }
}
