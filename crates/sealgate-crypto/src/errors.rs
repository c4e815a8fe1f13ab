//! Error taxonomy for the encryption core

use thiserror::Error;

/// Errors from key setup, wire parsing, and stream verification.
///
/// Every cryptographic or structural failure here is fatal and
/// non-retryable: retries (re-fetching ciphertext, re-negotiating a session
/// key) belong to the caller. Nothing is downgraded - a failed signature,
/// length, or decompression check means the plaintext must not be trusted,
/// even if it was partially readable.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Peer's session or ephemeral public key does not decode to a valid
    /// point on the protocol curve
    #[error("invalid session key: not a valid point on the protocol curve")]
    InvalidSessionKey,

    /// No encryption context was supplied alongside the ciphertext
    #[error("missing encryption context")]
    MissingEncryptionContext,

    /// Encryption context is too short or internally inconsistent
    #[error("invalid encryption context: {reason}")]
    InvalidEncryptionContext {
        /// What failed during structural validation
        reason: String,
    },

    /// Asymmetric wrap/unwrap requested against an incompatible key
    #[error("unsupported key type: {modulus_bits}-bit modulus")]
    UnsupportedKeyType {
        /// Modulus size of the offending key in bits
        modulus_bits: usize,
    },

    /// Wrapping key material failed (input too long for the modulus,
    /// misaligned key-wrap block)
    #[error("key wrap failed: {reason}")]
    WrapFailed {
        /// What the wrap primitive rejected
        reason: String,
    },

    /// Compressed stream is malformed or truncated
    #[error("decompression failed: {reason}")]
    DecompressionFailed {
        /// What failed while inflating
        reason: String,
    },

    /// Observed plaintext byte count disagrees with the declared length
    #[error("length mismatch: declared {declared}, observed {observed}")]
    LengthMismatch {
        /// Length declared in the encryption context
        declared: u64,
        /// Bytes actually observed on the stream
        observed: u64,
    },

    /// Detached signature does not verify over the observed plaintext and
    /// declared length
    #[error("signature invalid")]
    SignatureInvalid,

    /// A scheme demanded more derived key material than the KDF produced.
    /// This is a configuration error, caught at scheme construction - the
    /// derivation output is never silently truncated or stretched.
    #[error("key material exhausted: needed {needed}, available {available}")]
    KeyMaterialExhausted {
        /// Bytes the consumer asked for
        needed: usize,
        /// Bytes remaining in the derivation output
        available: usize,
    },

    /// Cascade must contain one or two ciphers
    #[error("invalid cascade: {ciphers} ciphers")]
    InvalidCascade {
        /// Number of ciphers requested
        ciphers: usize,
    },

    /// Scheme mixes a passphrase factor but none was configured
    #[error("passphrase required for this scheme")]
    PassphraseRequired,

    /// I/O failure in the underlying stream or buffer
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// Returns true if this error was detected before any key derivation
    /// or payload processing (a malformed input rather than a failed
    /// verification).
    pub fn is_structural(&self) -> bool {
        match self {
            Self::InvalidSessionKey
            | Self::MissingEncryptionContext
            | Self::InvalidEncryptionContext { .. }
            | Self::UnsupportedKeyType { .. }
            | Self::KeyMaterialExhausted { .. }
            | Self::InvalidCascade { .. }
            | Self::PassphraseRequired => true,

            Self::WrapFailed { .. }
            | Self::DecompressionFailed { .. }
            | Self::LengthMismatch { .. }
            | Self::SignatureInvalid
            | Self::Io(_) => false,
        }
    }

    /// Extract a `CryptoError` carried inside an `io::Error`.
    ///
    /// Stream adapters surface verification failures through `std::io::Read`,
    /// which forces them into `io::Error`. This recovers the typed error.
    pub fn from_io(err: &std::io::Error) -> Option<&Self> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Self>())
    }
}

impl From<CryptoError> for std::io::Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Io(io) => io,
            other => Self::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_errors_are_structural() {
        let err = CryptoError::InvalidEncryptionContext { reason: "too short".to_string() };
        assert!(err.is_structural());
        assert!(CryptoError::InvalidSessionKey.is_structural());
    }

    #[test]
    fn verification_errors_are_not_structural() {
        assert!(!CryptoError::SignatureInvalid.is_structural());
        assert!(!CryptoError::LengthMismatch { declared: 10, observed: 9 }.is_structural());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::LengthMismatch { declared: 100, observed: 42 };
        assert_eq!(err.to_string(), "length mismatch: declared 100, observed 42");
    }

    #[test]
    fn io_round_trip_preserves_kind() {
        let err = CryptoError::SignatureInvalid;
        let io: std::io::Error = err.into();
        let recovered = CryptoError::from_io(&io).unwrap();
        assert!(matches!(recovered, CryptoError::SignatureInvalid));
    }
}
