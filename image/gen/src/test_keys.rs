// Licensed under the Apache-2.0 license

use fwimage_fake_keys::*;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use crate::ImageSigningKey;

fn rsa(pem: &str) -> ImageSigningKey {
    ImageSigningKey::Rsa(Box::new(RsaPrivateKey::from_pkcs8_pem(pem).unwrap()))
}

pub fn rsa2048() -> ImageSigningKey {
    rsa(RSA2048_PRIVATE_PEM)
}

pub fn rsa3072() -> ImageSigningKey {
    rsa(RSA3072_PRIVATE_PEM)
}

pub fn rsa1024() -> ImageSigningKey {
    rsa(RSA1024_PRIVATE_PEM)
}

pub fn p224() -> ImageSigningKey {
    let secret = p224::SecretKey::from_sec1_pem(ECDSA_P224_PRIVATE_PEM).unwrap();
    ImageSigningKey::EcdsaP224(p224::ecdsa::SigningKey::from(secret))
}

pub fn p256() -> ImageSigningKey {
    let secret = p256::SecretKey::from_sec1_pem(ECDSA_P256_PRIVATE_PEM).unwrap();
    ImageSigningKey::EcdsaP256(p256::ecdsa::SigningKey::from(secret))
}

pub fn ed25519() -> ImageSigningKey {
    ImageSigningKey::Ed25519(ed25519_dalek::SigningKey::from_pkcs8_pem(ED25519_PRIVATE_PEM).unwrap())
}
