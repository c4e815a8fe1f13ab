//! Encryption side of the pipeline
//!
//! Composition order is a correctness-critical contract and is encoded
//! here, once: `plaintext → sign → compress → cipher(s) → chunk-digest →
//! spool`. The decrypt side mirrors it exactly.
//!
//! The stage types enforce the lifecycle at compile time: an [`Encrypter`]
//! can only be turned into a [`PayloadWriter`] once (it is consumed), and a
//! [`CryptoContext`] can only come from finishing that writer. There is no
//! runtime "already open" or "not closed" state to misuse.

use std::io::Write;

use ed25519_dalek::SigningKey;
use flate2::{Compression, write::ZlibEncoder};
use rand_core::CryptoRngCore;
use rsa::RsaPublicKey;
use sealgate_crypto::{
    CipherTransform, CipherWriter, CryptoError, KeyMaterial, MessageKeyPair, SessionPublicKey,
    StreamSigner, aes_wrap, derive, digest_passphrase, interleave, rsa_wrap,
};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    buffer::{BufferFactory, SpoolBuffer},
    chunks::ChunkDigestWriter,
    context::{CryptoContext, SALT_LEN, prepend_len},
    scheme::Scheme,
};

/// Keyed, single-use encryption pipeline head.
///
/// Construction performs the complete key setup: session-key decode (fail
/// fast on an invalid key), ephemeral agreement, derivation, and all
/// wrapping. The only work left for the stream stage is moving bytes.
pub struct Encrypter {
    transforms: Vec<CipherTransform>,
    context_tail: Vec<u8>,
    signing_key: SigningKey,
    spool: Box<dyn SpoolBuffer>,
    chunk_size: usize,
    scheme_name: &'static str,
}

impl Encrypter {
    /// Set up the pipeline for one message.
    ///
    /// `session_key` is the receiver's session public key in its canonical
    /// encoding; `passphrase` must be present for every scheme that mixes
    /// a passphrase factor.
    ///
    /// # Errors
    ///
    /// - `InvalidSessionKey` if `session_key` does not decode on the
    ///   protocol curve
    /// - `PassphraseRequired` if the scheme mixes a passphrase and none was
    ///   given
    /// - `UnsupportedKeyType` / `WrapFailed` from the asymmetric transport
    ///   setup
    pub fn new(
        scheme: Scheme,
        signing_key: &SigningKey,
        recipient_key: &RsaPublicKey,
        session_key: &[u8],
        passphrase: Option<&[u8]>,
        factory: &dyn BufferFactory,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self, CryptoError> {
        let session = SessionPublicKey::decode(session_key)?;
        let ephemeral = MessageKeyPair::generate(rng);
        let shared = ephemeral.agree(&session);
        let session_bytes = session.encode();
        let ephemeral_bytes = ephemeral.public().encode();

        let pass_digest = if scheme.mixes_passphrase() {
            let passphrase = passphrase.ok_or(CryptoError::PassphraseRequired)?;
            Some(Zeroizing::new(digest_passphrase(passphrase)))
        } else {
            None
        };
        let cascade = scheme.cascade()?;

        let (transforms, context_tail) = match scheme {
            Scheme::EcdhDirect { rsa_protected } => {
                let mut parts: Vec<&[u8]> = vec![&session_bytes, shared.as_bytes()];
                if let Some(pd) = pass_digest.as_deref() {
                    parts.push(pd);
                }
                let derived = Zeroizing::new(derive(&parts));
                let mut material = KeyMaterial::new(derived.to_vec());
                let transforms = cascade.keyed(&mut material)?;

                let tail = if rsa_protected {
                    rsa_wrap(recipient_key, rng, &ephemeral_bytes)?
                } else {
                    ephemeral_bytes.to_vec()
                };
                (transforms, tail)
            },

            Scheme::EcdhWrappedKey { rsa_protected }
            | Scheme::EcdhWrappedCascade { rsa_protected } => {
                let mut parts: Vec<&[u8]> = vec![&session_bytes, shared.as_bytes()];
                if let Some(pd) = pass_digest.as_deref() {
                    parts.push(pd);
                }
                let derived = Zeroizing::new(derive(&parts));
                let mut kek = [0u8; 32];
                kek.copy_from_slice(&derived[..32]);

                // Payload keys are random, independent of the derivation;
                // the derivation only protects them in transit
                let mut payload = Zeroizing::new(vec![0u8; cascade.material_len()]);
                rng.fill_bytes(&mut payload);
                let mut material = KeyMaterial::new(payload.to_vec());
                let transforms = cascade.keyed(&mut material)?;

                let blob = if rsa_protected {
                    rsa_wrap(recipient_key, rng, &payload)?
                } else {
                    payload.to_vec()
                };
                let wrapped = aes_wrap(&kek, &blob)?;
                kek.zeroize();

                let mut tail = Vec::with_capacity(1 + ephemeral_bytes.len() + wrapped.len());
                tail.push(ephemeral_bytes.len() as u8);
                tail.extend_from_slice(&ephemeral_bytes);
                tail.extend_from_slice(&wrapped);
                (transforms, tail)
            },

            Scheme::RsaEcdhSalted { cascade: double } => {
                let pd = pass_digest.as_deref().ok_or(CryptoError::PassphraseRequired)?;
                let mut salt = [0u8; SALT_LEN];
                rng.fill_bytes(&mut salt);

                let derived =
                    Zeroizing::new(derive(&[&session_bytes, shared.as_bytes(), pd, &salt]));
                let material_bytes = if double {
                    interleave(&derived, &salt).to_vec()
                } else {
                    derived.to_vec()
                };
                let mut material = KeyMaterial::new(material_bytes);
                let transforms = cascade.keyed(&mut material)?;

                let mut secret = Zeroizing::new(Vec::with_capacity(SALT_LEN + 97));
                secret.extend_from_slice(&salt);
                secret.extend_from_slice(&ephemeral_bytes);
                let tail = rsa_wrap(recipient_key, rng, &secret)?;
                salt.zeroize();
                (transforms, tail)
            },

            Scheme::RsaEcdhPlain => {
                let mut salt = [0u8; SALT_LEN];
                rng.fill_bytes(&mut salt);

                let derived = Zeroizing::new(derive(&[&session_bytes, shared.as_bytes(), &salt]));
                let mut material = KeyMaterial::new(derived.to_vec());
                let transforms = cascade.keyed(&mut material)?;

                let mut secret = Zeroizing::new(Vec::with_capacity(SALT_LEN + 97));
                secret.extend_from_slice(&salt);
                secret.extend_from_slice(&ephemeral_bytes);
                let tail = rsa_wrap(recipient_key, rng, &secret)?;
                salt.zeroize();
                (transforms, tail)
            },
        };

        Ok(Self {
            transforms,
            context_tail,
            signing_key: signing_key.clone(),
            spool: factory.create()?,
            chunk_size: factory.chunk_size(),
            scheme_name: scheme.name(),
        })
    }

    /// Open the plaintext stream, consuming the encrypter.
    ///
    /// Exactly one stream per instance; the move makes a second call
    /// unrepresentable.
    pub fn into_stream(self) -> PayloadWriter {
        let chunker = ChunkDigestWriter::new(self.spool, self.chunk_size);
        let cipher = CipherWriter::new(chunker, self.transforms);
        let encoder = ZlibEncoder::new(cipher, Compression::default());
        PayloadWriter {
            inner: encoder,
            signer: StreamSigner::new(),
            signing_key: self.signing_key,
            context_tail: self.context_tail,
            scheme_name: self.scheme_name,
        }
    }
}

/// Open plaintext stream. Write the payload, then call
/// [`finish`](Self::finish) to seal the artifact.
pub struct PayloadWriter {
    inner: ZlibEncoder<CipherWriter<ChunkDigestWriter<Box<dyn SpoolBuffer>>>>,
    signer: StreamSigner,
    signing_key: SigningKey,
    context_tail: Vec<u8>,
    scheme_name: &'static str,
}

impl PayloadWriter {
    /// Close the stream and produce the sealed result.
    ///
    /// Appends the detached signature, finalizes compression and the
    /// cipher cascade, seals the spool buffer, and assembles the
    /// encryption context (`len8 ‖ scheme tail`).
    pub fn finish(self) -> Result<CryptoContext, CryptoError> {
        let Self { mut inner, signer, signing_key, context_tail, scheme_name } = self;

        let plaintext_len = signer.count();
        let signature = signer.finalize(&signing_key);
        inner.write_all(&signature)?;

        let cipher = inner.finish()?;
        let chunker = cipher.into_inner();
        let (spool, summary) = chunker.finish()?;
        let sealed = spool.finish()?;

        let encryption_context = prepend_len(plaintext_len, &context_tail);
        tracing::debug!(
            scheme = scheme_name,
            plaintext_len,
            ciphertext_len = sealed.size(),
            chunks = summary.digests().len(),
            "payload sealed"
        );
        Ok(CryptoContext::new(sealed, encryption_context, plaintext_len, summary))
    }
}

impl Write for PayloadWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.signer.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
