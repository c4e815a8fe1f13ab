//! Negative-path coverage: tampered contexts, tampered ciphertext, forged
//! lengths, wrong keys. Every manipulation must surface as a typed error,
//! never as silently wrong plaintext.

use std::{
    io::{Read, Write},
    sync::OnceLock,
};

use ed25519_dalek::SigningKey;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sealgate_crypto::{CryptoError, SessionKeyPair};
use sealgate_pipeline::{CryptoContext, Decrypter, Encrypter, MemorySpoolFactory, Scheme};

const PASSPHRASE: &[u8] = b"between the lines";

fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0x7A3B);
        RsaPrivateKey::new(&mut rng, 2048).unwrap()
    })
}

struct Message {
    sealed: CryptoContext,
    ciphertext: Vec<u8>,
    session: SessionKeyPair,
    signing: SigningKey,
    scheme: Scheme,
}

fn message(scheme: Scheme, plaintext: &[u8], seed: u64) -> Message {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let signing = SigningKey::generate(&mut rng);
    let session = SessionKeyPair::generate(&mut rng);
    let recipient: RsaPublicKey = rsa_key().to_public_key();

    let session_key = session.public().encode();
    let factory = MemorySpoolFactory::new(512);
    let encrypter = Encrypter::new(
        scheme,
        &signing,
        &recipient,
        &session_key,
        Some(PASSPHRASE),
        &factory,
        &mut rng,
    )
    .unwrap();
    let mut writer = encrypter.into_stream();
    writer.write_all(plaintext).unwrap();
    let sealed = writer.finish().unwrap();

    let mut ciphertext = Vec::new();
    sealed.ciphertext_reader().unwrap().read_to_end(&mut ciphertext).unwrap();
    Message { sealed, ciphertext, session, signing, scheme }
}

impl Message {
    fn decrypter(self) -> Decrypter {
        Decrypter::new(
            self.scheme,
            self.session,
            rsa_key().clone(),
            self.signing.verifying_key(),
            Some(PASSPHRASE),
        )
    }
}

#[test]
fn empty_context_is_reported_as_missing() {
    let msg = message(Scheme::RsaEcdhPlain, b"payload", 1);
    let ciphertext = msg.ciphertext.clone();
    let result = msg.decrypter().decrypt_to_vec(ciphertext.as_slice(), &[]);
    assert!(matches!(result, Err(CryptoError::MissingEncryptionContext)));
}

#[test]
fn truncated_context_is_structurally_invalid() {
    let msg = message(Scheme::RsaEcdhPlain, b"payload", 2);
    let context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();
    let decrypter = msg.decrypter();

    for cut in [3usize, 8, 100, context.len() - 1] {
        let result = decrypter.decrypt_to_vec(ciphertext.as_slice(), &context[..cut]);
        assert!(
            matches!(result, Err(CryptoError::InvalidEncryptionContext { .. })),
            "cut at {cut}"
        );
    }
}

#[test]
fn flipped_byte_in_the_rsa_block_fails_closed() {
    let msg = message(Scheme::RsaEcdhSalted { cascade: false }, b"payload", 3);
    let mut context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();
    context[20] ^= 0x01; // inside the RSA transport block

    let result = msg.decrypter().decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(matches!(result, Err(CryptoError::InvalidEncryptionContext { .. })));
}

#[test]
fn flipped_byte_in_the_wrapped_key_blob_fails_closed() {
    let msg = message(Scheme::EcdhWrappedKey { rsa_protected: false }, b"payload", 4);
    let mut context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();
    let last = context.len() - 1;
    context[last] ^= 0x01; // inside the AES key wrap output

    let result = msg.decrypter().decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(matches!(result, Err(CryptoError::InvalidEncryptionContext { .. })));
}

#[test]
fn understated_length_prefix_is_a_length_mismatch() {
    let plaintext = vec![0x33u8; 100];
    let msg = message(Scheme::EcdhDirect { rsa_protected: false }, &plaintext, 5);
    let mut context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();
    context[..8].copy_from_slice(&99u64.to_be_bytes());

    let result = msg.decrypter().decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(matches!(
        result,
        Err(CryptoError::LengthMismatch { declared: 99, observed: 100 })
    ));
}

#[test]
fn overstated_length_prefix_is_rejected() {
    let plaintext = vec![0x33u8; 100];
    let msg = message(Scheme::EcdhDirect { rsa_protected: false }, &plaintext, 6);
    let mut context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();
    context[..8].copy_from_slice(&5000u64.to_be_bytes());

    let result = msg.decrypter().decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(result.is_err());
}

#[test]
fn flipped_ciphertext_byte_never_yields_plaintext() {
    let plaintext: Vec<u8> = (0..2_000u32).map(|i| (i % 250) as u8).collect();
    let msg = message(Scheme::EcdhWrappedCascade { rsa_protected: true }, &plaintext, 7);
    let context = msg.sealed.encryption_context().to_vec();
    let clean = msg.ciphertext.clone();
    let decrypter = msg.decrypter();

    for position in [0usize, clean.len() / 2, clean.len() - 1] {
        let mut tampered = clean.clone();
        tampered[position] ^= 0x80;
        let result = decrypter.decrypt_to_vec(tampered.as_slice(), &context);
        assert!(result.is_err(), "flip at {position} must not verify");
    }
}

#[test]
fn truncated_ciphertext_is_rejected() {
    let plaintext = vec![0x55u8; 5_000];
    let msg = message(Scheme::RsaEcdhPlain, &plaintext, 8);
    let context = msg.sealed.encryption_context().to_vec();
    let truncated = msg.ciphertext[..msg.ciphertext.len() / 2].to_vec();

    let result = msg.decrypter().decrypt_to_vec(truncated.as_slice(), &context);
    assert!(result.is_err());
}

#[test]
fn wrong_verifying_key_fails_the_signature() {
    let msg = message(Scheme::EcdhDirect { rsa_protected: false }, b"payload", 9);
    let context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();

    let impostor = SigningKey::generate(&mut ChaCha20Rng::seed_from_u64(999));
    let decrypter = Decrypter::new(
        msg.scheme,
        msg.session,
        rsa_key().clone(),
        impostor.verifying_key(),
        Some(PASSPHRASE),
    );
    let result = decrypter.decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
}

#[test]
fn wrong_passphrase_never_yields_plaintext() {
    let msg = message(Scheme::RsaEcdhSalted { cascade: true }, b"payload", 10);
    let context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();

    let decrypter = Decrypter::new(
        msg.scheme,
        msg.session,
        rsa_key().clone(),
        msg.signing.verifying_key(),
        Some(b"not the passphrase"),
    );
    let result = decrypter.decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(result.is_err());
}

#[test]
fn missing_passphrase_is_reported_before_any_decryption() {
    let msg = message(Scheme::EcdhDirect { rsa_protected: false }, b"payload", 11);
    let context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();

    let decrypter = Decrypter::new(
        msg.scheme,
        msg.session,
        rsa_key().clone(),
        msg.signing.verifying_key(),
        None,
    );
    let result = decrypter.decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(matches!(result, Err(CryptoError::PassphraseRequired)));
}

#[test]
fn wrong_session_key_never_yields_plaintext() {
    let msg = message(Scheme::EcdhWrappedKey { rsa_protected: true }, b"payload", 12);
    let context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();

    let other_session = SessionKeyPair::generate(&mut ChaCha20Rng::seed_from_u64(777));
    let decrypter = Decrypter::new(
        msg.scheme,
        other_session,
        rsa_key().clone(),
        msg.signing.verifying_key(),
        Some(PASSPHRASE),
    );
    let result = decrypter.decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(result.is_err());
}

#[test]
fn context_from_one_scheme_fails_another_schemes_shape_check() {
    let msg = message(Scheme::EcdhDirect { rsa_protected: false }, b"payload", 13);
    let context = msg.sealed.encryption_context().to_vec();
    let ciphertext = msg.ciphertext.clone();

    let decrypter = Decrypter::new(
        Scheme::RsaEcdhPlain,
        msg.session,
        rsa_key().clone(),
        msg.signing.verifying_key(),
        Some(PASSPHRASE),
    );
    let result = decrypter.decrypt_to_vec(ciphertext.as_slice(), &context);
    assert!(matches!(result, Err(CryptoError::InvalidEncryptionContext { .. })));
}
