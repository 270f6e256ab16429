use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rstest::rstest;

use crate::dsa::falcon::{
    FalconLevel, PublicKey, SecretKey, Signature,
    math::{KeygenConfig, TrapdoorError},
};
use crate::utils::{Deserializable, Serializable};

#[test]
fn test_secret_key_debug_redaction() {
    let seed = [1_u8; 32];
    let mut rng = ChaCha20Rng::from_seed(seed);
    let sk = SecretKey::with_rng(FalconLevel::Falcon512, &mut rng).unwrap();

    let debug_output = format!("{sk:?}");
    assert_eq!(debug_output, "<elided secret for SecretKey>");

    let display_output = format!("{sk}");
    assert_eq!(display_output, "<elided secret for SecretKey>");

    let basis_output = format!("{:?}", sk.short_lattice_basis());
    assert_eq!(basis_output, "<elided secret for NtruBasis>");
}

#[rstest]
#[case(FalconLevel::Falcon512)]
#[case(FalconLevel::Falcon1024)]
fn test_signature_determinism(#[case] level: FalconLevel) {
    let seed = [0_u8; 32];
    let mut rng = ChaCha20Rng::from_seed(seed);

    let sk = SecretKey::with_rng(level, &mut rng).unwrap();
    let message = b"data";

    let signature1 = sk.sign(message).unwrap();
    let signature2 = sk.sign(message).unwrap();

    let serialized = signature1.to_bytes();
    assert_eq!(serialized, signature2.to_bytes());
    assert_eq!(serialized.len(), level.params().sig_len);

    // a different message gets a different signature
    let other = sk.sign(b"other data").unwrap();
    assert_ne!(serialized, other.to_bytes());

    let pk = sk.public_key();
    assert!(pk.verify(message, &signature1));
    assert!(pk.verify(b"other data", &other));
}

#[test]
fn test_same_seed_same_key() {
    let sk1 = SecretKey::with_rng(FalconLevel::Falcon512, &mut ChaCha20Rng::from_seed([7; 32]));
    let sk2 = SecretKey::with_rng(FalconLevel::Falcon512, &mut ChaCha20Rng::from_seed([7; 32]));
    assert_eq!(sk1.unwrap().to_bytes(), sk2.unwrap().to_bytes());
}

#[test]
fn test_signature_from_bytes_verifies() {
    let mut rng = ChaCha20Rng::from_seed([2_u8; 32]);
    let sk = SecretKey::with_rng(FalconLevel::Falcon512, &mut rng).unwrap();
    let pk_bytes = sk.public_key().to_bytes();
    let message = b"transported message";
    let sig_bytes = sk.sign_with_rng(message, &mut rng).unwrap().to_bytes();

    let pk = PublicKey::read_from_bytes(&pk_bytes).unwrap();
    let signature = Signature::read_from_bytes(&sig_bytes).unwrap();
    assert!(pk.verify(message, &signature));

    // flipping a nonce byte changes the hashed point
    let mut tampered = sig_bytes.clone();
    tampered[1] ^= 1;
    let tampered = Signature::read_from_bytes(&tampered).unwrap();
    assert!(!pk.verify(message, &tampered));
}

#[test]
fn test_level_mismatch_does_not_verify() {
    let mut rng = ChaCha20Rng::from_seed([3_u8; 32]);
    let sk512 = SecretKey::with_rng(FalconLevel::Falcon512, &mut rng).unwrap();
    let sk1024 = SecretKey::with_rng(FalconLevel::Falcon1024, &mut rng).unwrap();

    let message = b"message";
    let signature = sk512.sign(message).unwrap();
    assert!(!sk1024.public_key().verify(message, &signature));
}

#[test]
fn test_secret_key_rejects_corrupted_encoding() {
    let mut rng = ChaCha20Rng::from_seed([4_u8; 32]);
    let sk = SecretKey::with_rng(FalconLevel::Falcon512, &mut rng).unwrap();
    let bytes = sk.to_bytes();

    // wrong header
    let mut wrong_header = bytes.clone();
    wrong_header[0] = 0x09;
    assert!(SecretKey::read_from_bytes(&wrong_header).is_err());

    // truncated
    assert!(SecretKey::read_from_bytes(&bytes[..bytes.len() - 1]).is_err());

    // F no longer satisfies the NTRU equation with (f, g)
    let mut wrong_big_f = bytes.clone();
    let last = wrong_big_f.len() - 1;
    wrong_big_f[last] ^= 0x01;
    assert!(SecretKey::read_from_bytes(&wrong_big_f).is_err());
}

#[test]
fn test_from_basis_round_trip() {
    let mut rng = ChaCha20Rng::from_seed([5_u8; 32]);
    let sk = SecretKey::with_rng(FalconLevel::Falcon512, &mut rng).unwrap();

    let rebuilt = SecretKey::from_basis(FalconLevel::Falcon512, sk.short_lattice_basis().clone())
        .unwrap();
    assert_eq!(rebuilt, sk);
    assert_eq!(rebuilt.public_key(), sk.public_key());

    // a 512 basis does not make a 1024 key
    assert!(
        SecretKey::from_basis(FalconLevel::Falcon1024, sk.short_lattice_basis().clone()).is_none()
    );
}

#[test]
fn test_exhausted_keygen_budget() {
    let mut rng = ChaCha20Rng::from_seed([6_u8; 32]);
    let config = KeygenConfig { max_attempts: 0 };
    let result = SecretKey::with_config(FalconLevel::Falcon512, &config, &mut rng);
    assert!(matches!(result, Err(TrapdoorError::KeyGenExhausted(0))));
}
