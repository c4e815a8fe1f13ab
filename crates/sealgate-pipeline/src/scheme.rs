//! The closed set of scheme variants
//!
//! Variants differ only in how the derivation is mixed, how many ciphers
//! run in cascade, and how the symmetric key material travels inside the
//! encryption context. One pipeline serves all of them; this enum is the
//! single source of variant truth.

use sealgate_crypto::{Cascade, CryptoError, StreamCipherSpec};

/// A fixed choice of derivation mixing, cascade arity, and key transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// ECDH payload-only: keys derived straight from the agreement, context
    /// carries just the ephemeral public key
    EcdhDirect {
        /// RSA-OAEP the ephemeral key bytes with the recipient's long-term
        /// key before inclusion
        rsa_protected: bool,
    },

    /// ECDH keyed-context: random payload key transported AES-wrapped under
    /// a derived key-encryption key
    EcdhWrappedKey {
        /// RSA-OAEP the payload (key, IV) blob before the AES wrap
        rsa_protected: bool,
    },

    /// ECDH keyed-context with a two-cipher cascade; the wrapped blob
    /// carries both (key, IV) pairs
    EcdhWrappedCascade {
        /// RSA-OAEP the cascade key blob before the AES wrap
        rsa_protected: bool,
    },

    /// RSA+ECDH with a passphrase-bound random salt; context is one RSA
    /// block over `salt ‖ ephemeral key`
    RsaEcdhSalted {
        /// Run the two-cipher cascade, stretching the derivation by
        /// interleaving it with the salt
        cascade: bool,
    },

    /// RSA+ECDH without a passphrase factor; context length is strictly
    /// `8 + modulus` bytes
    RsaEcdhPlain,
}

impl Scheme {
    /// Whether the pre-shared passphrase digest is mixed into derivation.
    ///
    /// Explicit per variant - never inferred from the context bytes.
    pub fn mixes_passphrase(self) -> bool {
        !matches!(self, Self::RsaEcdhPlain)
    }

    /// Cipher cascade for this variant, in encryption order (inner first).
    pub fn cascade(self) -> Result<Cascade, CryptoError> {
        let specs = match self {
            Self::EcdhDirect { .. } | Self::EcdhWrappedKey { .. } | Self::RsaEcdhPlain => {
                vec![StreamCipherSpec::Aes256Ctr]
            },
            Self::EcdhWrappedCascade { .. } => {
                vec![StreamCipherSpec::Aes256Ctr, StreamCipherSpec::TwofishCtr]
            },
            Self::RsaEcdhSalted { cascade: true } => {
                vec![StreamCipherSpec::Aes256Ctr, StreamCipherSpec::TwofishCtr]
            },
            Self::RsaEcdhSalted { cascade: false } => vec![StreamCipherSpec::Aes256Ctr],
        };
        Cascade::new(specs)
    }

    /// Stable name for logging. Never carries parameters or key material.
    pub fn name(self) -> &'static str {
        match self {
            Self::EcdhDirect { .. } => "ecdh-direct",
            Self::EcdhWrappedKey { .. } => "ecdh-wrapped-key",
            Self::EcdhWrappedCascade { .. } => "ecdh-wrapped-cascade",
            Self::RsaEcdhSalted { .. } => "rsa-ecdh-salted",
            Self::RsaEcdhPlain => "rsa-ecdh-plain",
        }
    }

    /// All variant instances, both cascade arities included. Test surface.
    pub fn all() -> Vec<Self> {
        vec![
            Self::EcdhDirect { rsa_protected: false },
            Self::EcdhDirect { rsa_protected: true },
            Self::EcdhWrappedKey { rsa_protected: false },
            Self::EcdhWrappedKey { rsa_protected: true },
            Self::EcdhWrappedCascade { rsa_protected: false },
            Self::EcdhWrappedCascade { rsa_protected: true },
            Self::RsaEcdhSalted { cascade: false },
            Self::RsaEcdhSalted { cascade: true },
            Self::RsaEcdhPlain,
        ]
    }
}
