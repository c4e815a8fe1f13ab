//! Chunked integrity digests over the ciphertext artifact
//!
//! As bytes pass through, a SHA-256 digest is accumulated per fixed-size
//! window, plus an aggregate digest over the concatenation of all chunk
//! digests. A holder of the digest list can verify a partial retrieval of a
//! large artifact without re-reading the whole thing.

use std::io::{Read, Write};

use sealgate_crypto::CryptoError;
use sha2::{Digest, Sha256};

/// Chunk digest width (SHA-256)
pub const CHUNK_DIGEST_LEN: usize = 32;

/// A single chunk digest.
pub type ChunkDigest = [u8; CHUNK_DIGEST_LEN];

/// Write adapter accumulating chunk digests over everything that passes
/// through. Deterministic regardless of write granularity: only byte
/// positions decide window boundaries.
pub struct ChunkDigestWriter<W: Write> {
    inner: W,
    chunk_size: usize,
    current: Sha256,
    filled: usize,
    digests: Vec<ChunkDigest>,
    total: u64,
}

impl<W: Write> ChunkDigestWriter<W> {
    /// Wrap `inner`, digesting `chunk_size`-byte windows.
    pub fn new(inner: W, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be non-zero");
        Self { inner, chunk_size, current: Sha256::new(), filled: 0, digests: Vec::new(), total: 0 }
    }

    fn absorb(&mut self, mut bytes: &[u8]) {
        self.total += bytes.len() as u64;
        while !bytes.is_empty() {
            let take = (self.chunk_size - self.filled).min(bytes.len());
            self.current.update(&bytes[..take]);
            self.filled += take;
            bytes = &bytes[take..];

            if self.filled == self.chunk_size {
                let digest = std::mem::take(&mut self.current).finalize();
                self.digests.push(digest.into());
                self.filled = 0;
            }
        }
    }

    /// Close the stream: digest the final partial window (if any), compute
    /// the digest-of-digests, and hand back the inner writer with the
    /// summary.
    pub fn finish(mut self) -> std::io::Result<(W, ChunkSummary)> {
        self.inner.flush()?;
        if self.filled > 0 {
            let digest = std::mem::take(&mut self.current).finalize();
            self.digests.push(digest.into());
        }
        let digest_of_digests = digest_of_digests(&self.digests);
        let summary = ChunkSummary {
            chunk_size: self.chunk_size,
            total_size: self.total,
            digests: self.digests,
            digest_of_digests,
        };
        Ok((self.inner, summary))
    }
}

impl<W: Write> Write for ChunkDigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.absorb(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Digest list produced by a closed [`ChunkDigestWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    chunk_size: usize,
    total_size: u64,
    digests: Vec<ChunkDigest>,
    digest_of_digests: ChunkDigest,
}

impl ChunkSummary {
    /// Configured window size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total bytes digested.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Ordered per-window digests.
    pub fn digests(&self) -> &[ChunkDigest] {
        &self.digests
    }

    /// Aggregate digest over the concatenated chunk digests.
    pub fn digest_of_digests(&self) -> &ChunkDigest {
        &self.digest_of_digests
    }
}

/// Aggregate digest over a concatenated digest list.
pub fn digest_of_digests(digests: &[ChunkDigest]) -> ChunkDigest {
    let mut hasher = Sha256::new();
    for digest in digests {
        hasher.update(digest);
    }
    hasher.finalize().into()
}

/// Re-digest an artifact and compare against an expected digest list.
///
/// For a holder of only the chunk digests (a relay, an auditor) verifying a
/// retrieved artifact - or a prefix of one - without the decryption keys.
/// `digests` may be a prefix of the full list when only the corresponding
/// prefix of the artifact is supplied, as long as the supplied bytes fill
/// whole windows.
pub fn verify_chunks(
    mut reader: impl Read,
    chunk_size: usize,
    digests: &[ChunkDigest],
) -> Result<(), CryptoError> {
    let mut window = vec![0u8; chunk_size.max(1)];
    for (index, expected) in digests.iter().enumerate() {
        let mut filled = 0;
        while filled < chunk_size {
            let n = reader.read(&mut window[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Err(CryptoError::LengthMismatch {
                declared: (digests.len() * chunk_size) as u64,
                observed: (index * chunk_size) as u64,
            });
        }
        let mut hasher = Sha256::new();
        hasher.update(&window[..filled]);
        let actual: ChunkDigest = hasher.finalize().into();
        if &actual != expected {
            return Err(CryptoError::InvalidEncryptionContext {
                reason: format!("chunk digest mismatch at window {index}"),
            });
        }
    }
    Ok(())
}
