//! Sealgate Cryptographic Primitives
//!
//! Building blocks for the hybrid streaming encryption pipeline. All
//! functions are pure or instance-scoped - random bytes come from a
//! caller-provided RNG capability. Nothing in this crate logs or prints
//! key material.
//!
//! # Key Setup
//!
//! Each message performs one ephemeral-static ECDH agreement on the fixed
//! protocol curve (NIST P-384), then derives symmetric key material with a
//! one-shot SHA-384 concat-KDF:
//!
//! ```text
//! Ephemeral P-384 Pair (per message)
//!        │
//!        ▼ ECDH with peer session key
//! Shared Secret
//!        │
//!        ▼ SHA-384(sessionPub ‖ secret ‖ factors...)
//! Key Material ──slice──▶ (key, IV) per cascade cipher
//! ```
//!
//! Shared secrets, derived material, and payload keys are zeroized when
//! dropped. Ephemeral pairs are generated once per message and never reused.
//!
//! # Security
//!
//! - Key/IV pairs are single-use: fresh randomness or a fresh agreement per
//!   message, never reused across messages
//! - The detached signature binds the plaintext to its declared length,
//!   defeating truncation and extension of the stream
//! - All verification failures are fatal; partial verification is failure

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod agreement;
pub mod cipher;
pub mod errors;
pub mod kdf;
pub mod sign;
pub mod wrap;

pub use agreement::{
    MessageKeyPair, SESSION_PUBLIC_KEY_LEN, SessionKeyPair, SessionPublicKey, SharedSecret,
};
pub use cipher::{Cascade, CipherReader, CipherTransform, CipherWriter, StreamCipherSpec};
pub use errors::CryptoError;
pub use kdf::{DERIVED_LEN, KeyMaterial, derive, digest_passphrase, interleave};
pub use sign::{SIGNATURE_LEN, StreamSigner, StreamVerifier};
pub use wrap::{aes_unwrap, aes_wrap, rsa_unwrap, rsa_wrap};
