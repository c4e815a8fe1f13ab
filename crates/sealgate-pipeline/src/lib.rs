//! Streaming encryption pipeline: composition of the primitive layers into
//! sealed, verifiable payload artifacts.
//!
//! One pipeline serves every [`Scheme`] variant; the variants differ only in
//! key setup, never in stream composition:
//!
//! ```text
//!   encrypt:  plaintext → sign → compress → cipher(s) → chunk-digest → spool
//!   decrypt:  ciphertext → cipher(s) reversed → decompress → verify → plaintext
//! ```
//!
//! The sender drives an [`Encrypter`] into a [`PayloadWriter`] and finishes
//! it into a [`CryptoContext`]: the sealed ciphertext, the encryption
//! context blob, and the chunk digest metadata. The receiver hands the
//! context and a ciphertext reader to a [`Decrypter`] and reads verified
//! plaintext back out.
//!
//! Verification is all-or-nothing: a [`PlaintextReader`] yields its final
//! `Ok(0)` only after the declared length matched, the stream ended where
//! it should, and the detached signature verified.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod buffer;
pub mod chunks;
pub mod context;
pub mod decrypt;
pub mod encrypt;
pub mod scheme;

pub use buffer::{BufferFactory, MemorySpoolFactory, SealedBuffer, SpoolBuffer, TempSpoolFactory};
pub use chunks::{
    CHUNK_DIGEST_LEN, ChunkDigest, ChunkDigestWriter, ChunkSummary, digest_of_digests,
    verify_chunks,
};
pub use context::{CryptoContext, LEN_PREFIX_LEN, SALT_LEN};
pub use decrypt::{Decrypter, PlaintextReader};
pub use encrypt::{Encrypter, PayloadWriter};
pub use scheme::Scheme;
pub use sealgate_crypto::CryptoError;
