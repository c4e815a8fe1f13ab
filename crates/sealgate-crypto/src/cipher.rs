//! Stream cipher specs and cascade composition
//!
//! Ciphers run in counter mode: no padding, ciphertext length equals input
//! length, and the encrypt and decrypt transforms are the same keystream
//! XOR. A cascade is an ordered list of one or two specs; each spec is keyed
//! with its own independently generated (key, IV) pair - reusing one
//! cipher's key for the other is a design error the slicer makes
//! impossible.

use std::io::{Read, Write};

use aes::Aes256;
use cipher::{KeyIvInit, StreamCipher};
use twofish::Twofish;

use crate::{errors::CryptoError, kdf::KeyMaterial};

type Aes256CtrImpl = ctr::Ctr128BE<Aes256>;
type TwofishCtrImpl = ctr::Ctr128BE<Twofish>;

/// Symmetric stream cipher descriptor: declared key/IV widths plus
/// transform construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCipherSpec {
    /// AES-256 in CTR mode (key 32, IV 16)
    Aes256Ctr,
    /// Twofish-256 in CTR mode (key 32, IV 16)
    TwofishCtr,
}

impl StreamCipherSpec {
    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes256Ctr | Self::TwofishCtr => 32,
        }
    }

    /// IV length in bytes.
    pub fn iv_len(self) -> usize {
        match self {
            Self::Aes256Ctr | Self::TwofishCtr => 16,
        }
    }

    /// Build the keyed transform for this spec.
    ///
    /// CTR mode: the same transform both encrypts and decrypts.
    pub fn transform(self, key: &[u8], iv: &[u8]) -> Result<CipherTransform, CryptoError> {
        let mismatch = CryptoError::KeyMaterialExhausted {
            needed: self.key_len() + self.iv_len(),
            available: key.len() + iv.len(),
        };
        match self {
            Self::Aes256Ctr => Aes256CtrImpl::new_from_slices(key, iv)
                .map(CipherTransform::Aes256Ctr)
                .map_err(|_| mismatch),
            Self::TwofishCtr => TwofishCtrImpl::new_from_slices(key, iv)
                .map(CipherTransform::TwofishCtr)
                .map_err(|_| mismatch),
        }
    }
}

/// A keyed counter-mode transform.
pub enum CipherTransform {
    /// Keyed AES-256-CTR keystream
    Aes256Ctr(Aes256CtrImpl),
    /// Keyed Twofish-CTR keystream
    TwofishCtr(TwofishCtrImpl),
}

impl CipherTransform {
    /// XOR the keystream over `buf` in place, advancing the counter.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes256Ctr(inner) => inner.apply_keystream(buf),
            Self::TwofishCtr(inner) => inner.apply_keystream(buf),
        }
    }
}

/// Ordered cascade of one or two cipher specs.
///
/// Encryption applies the transforms in declaration order (inner first on
/// write); decryption applies them in reverse. Each spec consumes its own
/// (key, IV) slice from the supplied material, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    specs: Vec<StreamCipherSpec>,
}

impl Cascade {
    /// Build a cascade from an ordered spec list (one or two entries).
    pub fn new(specs: Vec<StreamCipherSpec>) -> Result<Self, CryptoError> {
        if specs.is_empty() || specs.len() > 2 {
            return Err(CryptoError::InvalidCascade { ciphers: specs.len() });
        }
        Ok(Self { specs })
    }

    /// Number of ciphers in the cascade.
    pub fn arity(&self) -> usize {
        self.specs.len()
    }

    /// Total key material demand: sum of key + IV lengths across specs.
    pub fn material_len(&self) -> usize {
        self.specs.iter().map(|s| s.key_len() + s.iv_len()).sum()
    }

    /// Key every spec from successive slices of `material`, in cascade
    /// order. Fails if the material is shorter than the declared demand.
    pub fn keyed(&self, material: &mut KeyMaterial) -> Result<Vec<CipherTransform>, CryptoError> {
        let mut transforms = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let key = material.take(spec.key_len())?.to_vec();
            let iv = material.take(spec.iv_len())?;
            transforms.push(spec.transform(&key, iv)?);
        }
        Ok(transforms)
    }
}

/// Write adapter applying a keyed cascade to everything passing through.
pub struct CipherWriter<W: Write> {
    inner: W,
    transforms: Vec<CipherTransform>,
    scratch: Vec<u8>,
}

impl<W: Write> CipherWriter<W> {
    /// Wrap `inner`, applying `transforms` in order to every written byte.
    pub fn new(inner: W, transforms: Vec<CipherTransform>) -> Self {
        Self { inner, transforms, scratch: Vec::new() }
    }

    /// Unwrap, discarding the keyed transforms.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        for transform in &mut self.transforms {
            transform.apply_keystream(&mut self.scratch);
        }
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Read adapter applying a keyed cascade to everything read through it.
///
/// For decryption, pass the transforms mirrored: last cascade entry first.
pub struct CipherReader<R: Read> {
    inner: R,
    transforms: Vec<CipherTransform>,
}

impl<R: Read> CipherReader<R> {
    /// Wrap `inner`, applying `transforms` in the given order to every
    /// byte read.
    pub fn new(inner: R, transforms: Vec<CipherTransform>) -> Self {
        Self { inner, transforms }
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        for transform in &mut self.transforms {
            transform.apply_keystream(&mut buf[..n]);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf;

    fn cascade(specs: Vec<StreamCipherSpec>) -> Vec<CipherTransform> {
        let cascade = Cascade::new(specs).unwrap();
        let mut material =
            KeyMaterial::new((0..cascade.material_len()).map(|i| i as u8).collect::<Vec<u8>>());
        cascade.keyed(&mut material).unwrap()
    }

    #[test]
    fn ctr_transform_is_its_own_inverse() {
        let plaintext = b"counter mode keeps the length".to_vec();

        let mut encrypted = plaintext.clone();
        for t in &mut cascade(vec![StreamCipherSpec::Aes256Ctr]) {
            t.apply_keystream(&mut encrypted);
        }
        assert_ne!(encrypted, plaintext);
        assert_eq!(encrypted.len(), plaintext.len());

        let mut decrypted = encrypted;
        for t in &mut cascade(vec![StreamCipherSpec::Aes256Ctr]) {
            t.apply_keystream(&mut decrypted);
        }
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn cascade_decrypts_in_reverse_order() {
        let plaintext = vec![0x5Au8; 1000];
        let specs = vec![StreamCipherSpec::Aes256Ctr, StreamCipherSpec::TwofishCtr];

        let mut ciphertext = plaintext.clone();
        for t in &mut cascade(specs.clone()) {
            t.apply_keystream(&mut ciphertext);
        }

        let mut transforms = cascade(specs);
        transforms.reverse();
        let mut decrypted = ciphertext;
        for t in &mut transforms {
            t.apply_keystream(&mut decrypted);
        }
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn writer_and_reader_round_trip() {
        use std::io::{Cursor, Read as _, Write as _};

        let plaintext: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let specs = vec![StreamCipherSpec::Aes256Ctr, StreamCipherSpec::TwofishCtr];

        let mut writer = CipherWriter::new(Vec::new(), cascade(specs.clone()));
        // Uneven write sizes must not affect the keystream position
        writer.write_all(&plaintext[..7]).unwrap();
        writer.write_all(&plaintext[7..1000]).unwrap();
        writer.write_all(&plaintext[1000..]).unwrap();
        let ciphertext = writer.into_inner();

        let mut transforms = cascade(specs);
        transforms.reverse();
        let mut reader = CipherReader::new(Cursor::new(ciphertext), transforms);
        let mut decrypted = Vec::new();
        reader.read_to_end(&mut decrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn cascade_rejects_zero_or_three_ciphers() {
        assert!(matches!(Cascade::new(vec![]), Err(CryptoError::InvalidCascade { ciphers: 0 })));
        let three = vec![StreamCipherSpec::Aes256Ctr; 3];
        assert!(matches!(Cascade::new(three), Err(CryptoError::InvalidCascade { ciphers: 3 })));
    }

    #[test]
    fn keyed_fails_on_short_material() {
        let cascade =
            Cascade::new(vec![StreamCipherSpec::Aes256Ctr, StreamCipherSpec::TwofishCtr]).unwrap();
        // Only enough for one cipher
        let mut material = KeyMaterial::new(kdf::derive(&[b"short"]).to_vec());
        assert!(matches!(
            cascade.keyed(&mut material),
            Err(CryptoError::KeyMaterialExhausted { .. })
        ));
    }

    #[test]
    fn distinct_keys_produce_distinct_keystreams() {
        let spec = StreamCipherSpec::Aes256Ctr;
        let mut a = spec.transform(&[1u8; 32], &[0u8; 16]).unwrap();
        let mut b = spec.transform(&[2u8; 32], &[0u8; 16]).unwrap();

        let mut buf_a = [0u8; 64];
        let mut buf_b = [0u8; 64];
        a.apply_keystream(&mut buf_a);
        b.apply_keystream(&mut buf_b);
        assert_ne!(buf_a, buf_b);
    }
}
