//! Decryption side of the pipeline
//!
//! Mirrors the write composition exactly: `ciphertext → cipher(s) in
//! reverse → decompress → verify → plaintext`. Context validation happens
//! eagerly, before any key derivation; length and signature verification
//! surface lazily as the caller reads.

use std::io::Read;

use ed25519_dalek::VerifyingKey;
use flate2::read::ZlibDecoder;
use rsa::{RsaPrivateKey, traits::PublicKeyParts};
use sealgate_crypto::{
    CipherReader, CipherTransform, CryptoError, KeyMaterial, SESSION_PUBLIC_KEY_LEN,
    SIGNATURE_LEN, SessionKeyPair, SessionPublicKey, StreamVerifier, aes_unwrap, derive,
    digest_passphrase, interleave, rsa_unwrap,
};
use zeroize::Zeroizing;

use crate::{
    context::{self, ContextBody, SALT_LEN},
    scheme::Scheme,
};

/// Stateless decryption endpoint for one scheme and one set of local keys.
///
/// `decrypt` is idempotent and may be called any number of times with
/// different ciphertexts and contexts.
pub struct Decrypter {
    scheme: Scheme,
    session: SessionKeyPair,
    decryption_key: RsaPrivateKey,
    verifying_key: VerifyingKey,
    passphrase: Option<Zeroizing<Vec<u8>>>,
}

impl Decrypter {
    /// Bind the local key material: the receiver's session pair, its
    /// long-term RSA key, the sender's signature verification key, and the
    /// pre-shared passphrase (for schemes that mix one).
    pub fn new(
        scheme: Scheme,
        session: SessionKeyPair,
        decryption_key: RsaPrivateKey,
        verifying_key: VerifyingKey,
        passphrase: Option<&[u8]>,
    ) -> Self {
        Self {
            scheme,
            session,
            decryption_key,
            verifying_key,
            passphrase: passphrase.map(|p| Zeroizing::new(p.to_vec())),
        }
    }

    /// Open a verified plaintext stream over `ciphertext`.
    ///
    /// Structural context errors are returned immediately; length and
    /// signature failures surface through the reader, at the point the
    /// caller reads past where the check fails. No plaintext may be
    /// trusted until the reader has returned its final `Ok(0)`.
    pub fn decrypt<R: Read>(
        &self,
        ciphertext: R,
        encryption_context: &[u8],
    ) -> Result<PlaintextReader<R>, CryptoError> {
        let parsed =
            context::parse(self.scheme, encryption_context, self.decryption_key.size())?;
        let mut transforms = self.keyed_transforms(&parsed.body)?;
        // Mirror of the write side: outermost cipher peels first
        transforms.reverse();

        tracing::debug!(
            scheme = self.scheme.name(),
            declared_len = parsed.declared_len,
            "opening plaintext stream"
        );
        let decoder = ZlibDecoder::new(CipherReader::new(ciphertext, transforms));
        Ok(PlaintextReader {
            inner: decoder,
            verifier: Some(StreamVerifier::new(parsed.declared_len)),
            verifying_key: self.verifying_key,
            finalized: false,
        })
    }

    /// Decrypt and verify an entire payload into memory.
    ///
    /// Convenience over [`decrypt`](Self::decrypt) for payloads that fit in
    /// memory; returns plaintext only after every check has passed.
    pub fn decrypt_to_vec(
        &self,
        ciphertext: impl Read,
        encryption_context: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut reader = self.decrypt(ciphertext, encryption_context)?;
        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| e.downcast::<CryptoError>().unwrap_or_else(CryptoError::Io))?;
        Ok(plaintext)
    }

    fn passphrase_digest(&self) -> Result<Zeroizing<[u8; 48]>, CryptoError> {
        let passphrase = self.passphrase.as_ref().ok_or(CryptoError::PassphraseRequired)?;
        Ok(Zeroizing::new(digest_passphrase(passphrase)))
    }

    /// Rebuild the keyed cascade from the parsed context body.
    fn keyed_transforms(&self, body: &ContextBody) -> Result<Vec<CipherTransform>, CryptoError> {
        let session_bytes = self.session.public().encode();
        let cascade = self.scheme.cascade()?;

        match (self.scheme, body) {
            (Scheme::EcdhDirect { rsa_protected }, ContextBody::Direct(field)) => {
                let ephemeral_bytes = if rsa_protected {
                    Zeroizing::new(rsa_unwrap(&self.decryption_key, field)?)
                } else {
                    Zeroizing::new(field.clone())
                };
                let ephemeral = SessionPublicKey::decode(&ephemeral_bytes)?;
                let shared = self.session.agree(&ephemeral);

                let pd = self.passphrase_digest()?;
                let derived =
                    Zeroizing::new(derive(&[&session_bytes, shared.as_bytes(), pd.as_slice()]));
                let mut material = KeyMaterial::new(derived.to_vec());
                cascade.keyed(&mut material)
            },

            (
                Scheme::EcdhWrappedKey { rsa_protected }
                | Scheme::EcdhWrappedCascade { rsa_protected },
                ContextBody::Keyed { ephemeral, wrapped },
            ) => {
                let ephemeral = SessionPublicKey::decode(ephemeral)?;
                let shared = self.session.agree(&ephemeral);

                let pd = self.passphrase_digest()?;
                let derived =
                    Zeroizing::new(derive(&[&session_bytes, shared.as_bytes(), pd.as_slice()]));
                let mut kek = [0u8; 32];
                kek.copy_from_slice(&derived[..32]);

                let blob = Zeroizing::new(aes_unwrap(&kek, wrapped)?);
                let payload = if rsa_protected {
                    Zeroizing::new(rsa_unwrap(&self.decryption_key, &blob)?)
                } else {
                    blob
                };
                if payload.len() != cascade.material_len() {
                    return Err(CryptoError::InvalidEncryptionContext {
                        reason: format!("payload key blob is {} bytes", payload.len()),
                    });
                }
                let mut material = KeyMaterial::new(payload.to_vec());
                cascade.keyed(&mut material)
            },

            (Scheme::RsaEcdhSalted { cascade: double }, ContextBody::RsaBlob(blob)) => {
                let (salt, ephemeral) = self.unwrap_salted_blob(blob)?;
                let shared = self.session.agree(&ephemeral);

                let pd = self.passphrase_digest()?;
                let derived = Zeroizing::new(derive(&[
                    &session_bytes,
                    shared.as_bytes(),
                    pd.as_slice(),
                    salt.as_slice(),
                ]));
                let material_bytes = if double {
                    interleave(&derived, &salt).to_vec()
                } else {
                    derived.to_vec()
                };
                let mut material = KeyMaterial::new(material_bytes);
                cascade.keyed(&mut material)
            },

            (Scheme::RsaEcdhPlain, ContextBody::RsaBlob(blob)) => {
                let (salt, ephemeral) = self.unwrap_salted_blob(blob)?;
                let shared = self.session.agree(&ephemeral);

                let derived = Zeroizing::new(derive(&[
                    &session_bytes,
                    shared.as_bytes(),
                    salt.as_slice(),
                ]));
                let mut material = KeyMaterial::new(derived.to_vec());
                cascade.keyed(&mut material)
            },

            // parse() pairs each scheme with its own body shape
            _ => Err(CryptoError::InvalidEncryptionContext {
                reason: "context body does not match the scheme".to_string(),
            }),
        }
    }

    /// Unwrap an RSA transport blob into `(salt48, ephemeral key)`.
    fn unwrap_salted_blob(
        &self,
        blob: &[u8],
    ) -> Result<(Zeroizing<[u8; SALT_LEN]>, SessionPublicKey), CryptoError> {
        let secret = Zeroizing::new(rsa_unwrap(&self.decryption_key, blob)?);
        if secret.len() != SALT_LEN + SESSION_PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidEncryptionContext {
                reason: format!("transport blob unwrapped to {} bytes", secret.len()),
            });
        }
        let mut salt = Zeroizing::new([0u8; SALT_LEN]);
        salt.copy_from_slice(&secret[..SALT_LEN]);
        let ephemeral = SessionPublicKey::decode(&secret[SALT_LEN..])?;
        Ok((salt, ephemeral))
    }
}

/// Lazily verified plaintext stream.
///
/// Serves exactly the declared number of plaintext bytes, then consumes
/// the signature trailer, asserts end-of-stream, and verifies. All
/// failures are final: after an error, or after the terminating `Ok(0)`,
/// the reader yields nothing further.
pub struct PlaintextReader<R: Read> {
    inner: ZlibDecoder<CipherReader<R>>,
    verifier: Option<StreamVerifier>,
    verifying_key: VerifyingKey,
    finalized: bool,
}

impl<R: Read> PlaintextReader<R> {
    fn read_inner(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidInput
                || (e.kind() == std::io::ErrorKind::InvalidData
                    && CryptoError::from_io(&e).is_none())
            {
                CryptoError::DecompressionFailed { reason: e.to_string() }.into()
            } else {
                e
            }
        })
    }

    /// Consume the signature trailer, assert EOF, verify.
    fn finalize(&mut self) -> std::io::Result<()> {
        self.finalized = true;
        let Some(verifier) = self.verifier.take() else {
            return Ok(());
        };

        let mut signature = [0u8; SIGNATURE_LEN];
        let mut filled = 0;
        while filled < SIGNATURE_LEN {
            let n = self.read_inner(&mut signature[filled..])?;
            if n == 0 {
                return Err(CryptoError::DecompressionFailed {
                    reason: "stream ended before the signature trailer".to_string(),
                }
                .into());
            }
            filled += n;
        }

        // Anything after the trailer means the real plaintext was longer
        // than declared
        let mut scratch = [0u8; 4096];
        let mut extra: u64 = 0;
        loop {
            let n = self.read_inner(&mut scratch)?;
            if n == 0 {
                break;
            }
            extra += n as u64;
        }
        if extra > 0 {
            return Err(CryptoError::LengthMismatch {
                declared: verifier.declared(),
                observed: verifier.declared() + extra,
            }
            .into());
        }

        verifier.finish(&self.verifying_key, &signature)?;
        Ok(())
    }
}

impl<R: Read> Read for PlaintextReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.finalized {
            return Ok(0);
        }
        let Some(verifier) = self.verifier.as_ref() else {
            return Ok(0);
        };
        let remaining = verifier.declared() - verifier.observed();
        if remaining == 0 {
            self.finalize()?;
            return Ok(0);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = self.read_inner(&mut buf[..want])?;
        if n == 0 {
            // Stream ended before the declared plaintext length
            let verifier = self.verifier.take();
            self.finalized = true;
            let (declared, observed) = verifier
                .map(|v| (v.declared(), v.observed()))
                .unwrap_or_default();
            return Err(CryptoError::LengthMismatch { declared, observed }.into());
        }

        if let Some(verifier) = self.verifier.as_mut() {
            verifier.update(&buf[..n]);
        }
        // The trailer is consumed and verified on the next call, once the
        // caller has taken delivery of these bytes
        Ok(n)
    }
}
