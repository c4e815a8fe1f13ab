//! Encryption-context wire codec and the sealed result artifact
//!
//! The encryption context is the only out-of-band data the receiver needs
//! beyond its own keys and the pre-shared passphrase. All integers are
//! big-endian; every layout starts with the 8-byte plaintext length.
//! Validation is cheapest-first: presence, length prefix, then the
//! scheme-specific body shape - all before any key derivation or unwrap.

use std::io::Read;

use sealgate_crypto::{CryptoError, SESSION_PUBLIC_KEY_LEN};

use crate::{
    buffer::SealedBuffer,
    chunks::{ChunkDigest, ChunkSummary},
    scheme::Scheme,
};

/// Plaintext length prefix width (8-byte big-endian)
pub const LEN_PREFIX_LEN: usize = 8;

/// Salt width for the RSA+ECDH variants
pub const SALT_LEN: usize = 48;

/// AES key wrap adds one 8-byte integrity block
const KEY_WRAP_OVERHEAD: usize = 8;

/// Structurally validated encryption context, before any cryptography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedContext {
    /// Plaintext length declared by the sender
    pub declared_len: u64,
    /// Scheme-specific body fields
    pub body: ContextBody,
}

/// Scheme-specific context body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContextBody {
    /// Ephemeral public key, possibly RSA-wrapped (direct scheme)
    Direct(Vec<u8>),
    /// Plain ephemeral key plus AES-wrapped payload key blob
    Keyed {
        /// SEC1-encoded ephemeral public key
        ephemeral: Vec<u8>,
        /// AES key wrap output carrying the payload (key, IV) material
        wrapped: Vec<u8>,
    },
    /// One RSA block over `salt ‖ ephemeral key` (salted/plain schemes)
    RsaBlob(Vec<u8>),
}

/// Prefix a context tail with the 8-byte big-endian plaintext length.
pub(crate) fn prepend_len(plaintext_len: u64, tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LEN_PREFIX_LEN + tail.len());
    out.extend_from_slice(&plaintext_len.to_be_bytes());
    out.extend_from_slice(tail);
    out
}

fn invalid(reason: impl Into<String>) -> CryptoError {
    CryptoError::InvalidEncryptionContext { reason: reason.into() }
}

/// Validate a context blob structurally and split it into fields.
///
/// `modulus_len` is the byte length of the local RSA modulus; the RSA-based
/// layouts have fixed total lengths derived from it, checked strictly here
/// before any unwrap is attempted.
pub(crate) fn parse(
    scheme: Scheme,
    bytes: &[u8],
    modulus_len: usize,
) -> Result<ParsedContext, CryptoError> {
    if bytes.is_empty() {
        return Err(CryptoError::MissingEncryptionContext);
    }
    if bytes.len() < LEN_PREFIX_LEN {
        return Err(invalid("shorter than the length prefix"));
    }
    let mut len8 = [0u8; LEN_PREFIX_LEN];
    len8.copy_from_slice(&bytes[..LEN_PREFIX_LEN]);
    let declared_len = u64::from_be_bytes(len8);
    let body = &bytes[LEN_PREFIX_LEN..];

    let body = match scheme {
        Scheme::EcdhDirect { rsa_protected } => {
            let expected = if rsa_protected { modulus_len } else { SESSION_PUBLIC_KEY_LEN };
            if body.len() != expected {
                return Err(invalid(format!(
                    "ephemeral key field is {} bytes, expected {expected}",
                    body.len()
                )));
            }
            ContextBody::Direct(body.to_vec())
        },

        Scheme::EcdhWrappedKey { rsa_protected }
        | Scheme::EcdhWrappedCascade { rsa_protected } => {
            let Some((&key_len, rest)) = body.split_first() else {
                return Err(invalid("missing ephemeral key length prefix"));
            };
            if key_len as usize != SESSION_PUBLIC_KEY_LEN {
                return Err(invalid(format!("ephemeral key length prefix {key_len}")));
            }
            if rest.len() <= SESSION_PUBLIC_KEY_LEN {
                return Err(invalid("truncated before the wrapped key blob"));
            }
            let (ephemeral, wrapped) = rest.split_at(SESSION_PUBLIC_KEY_LEN);

            let inner = if rsa_protected { modulus_len } else { scheme.cascade()?.material_len() };
            let expected = inner + KEY_WRAP_OVERHEAD;
            if wrapped.len() != expected {
                return Err(invalid(format!(
                    "wrapped key blob is {} bytes, expected {expected}",
                    wrapped.len()
                )));
            }
            ContextBody::Keyed { ephemeral: ephemeral.to_vec(), wrapped: wrapped.to_vec() }
        },

        Scheme::RsaEcdhSalted { .. } | Scheme::RsaEcdhPlain => {
            // Total context length is exactly 8 + modulus; reject anything
            // else before touching the RSA layer
            if body.len() != modulus_len {
                return Err(invalid(format!(
                    "RSA block is {} bytes, expected {modulus_len}",
                    body.len()
                )));
            }
            ContextBody::RsaBlob(body.to_vec())
        },
    };

    Ok(ParsedContext { declared_len, body })
}

/// Immutable result of one encryption: the sealed ciphertext, the context
/// blob the receiver needs, and the chunk digest metadata.
pub struct CryptoContext {
    ciphertext: Box<dyn SealedBuffer>,
    encryption_context: Vec<u8>,
    plaintext_len: u64,
    summary: ChunkSummary,
}

impl CryptoContext {
    pub(crate) fn new(
        ciphertext: Box<dyn SealedBuffer>,
        encryption_context: Vec<u8>,
        plaintext_len: u64,
        summary: ChunkSummary,
    ) -> Self {
        Self { ciphertext, encryption_context, plaintext_len, summary }
    }

    /// The opaque context blob transmitted alongside the ciphertext.
    pub fn encryption_context(&self) -> &[u8] {
        &self.encryption_context
    }

    /// Open a reader over the sealed ciphertext.
    pub fn ciphertext_reader(&self) -> std::io::Result<Box<dyn Read + Send>> {
        self.ciphertext.reader()
    }

    /// Plaintext length as declared in the context.
    pub fn plaintext_len(&self) -> u64 {
        self.plaintext_len
    }

    /// Ciphertext artifact length.
    pub fn ciphertext_len(&self) -> u64 {
        self.ciphertext.size()
    }

    /// Chunk window size the artifact was digested with.
    pub fn chunk_size(&self) -> usize {
        self.summary.chunk_size()
    }

    /// Ordered chunk digests over the ciphertext artifact.
    pub fn chunk_digests(&self) -> &[ChunkDigest] {
        self.summary.digests()
    }

    /// Aggregate digest over the concatenated chunk digests.
    pub fn digest_of_digests(&self) -> &ChunkDigest {
        self.summary.digest_of_digests()
    }
}

// Manual Debug: the ciphertext handle is opaque and the context blob is
// not worth dumping
impl std::fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext")
            .field("plaintext_len", &self.plaintext_len)
            .field("ciphertext_len", &self.ciphertext.size())
            .field("context_len", &self.encryption_context.len())
            .field("chunk_size", &self.summary.chunk_size())
            .field("chunks", &self.summary.digests().len())
            .finish_non_exhaustive()
    }
}
