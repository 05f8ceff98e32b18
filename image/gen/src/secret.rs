/*++

Licensed under the Apache-2.0 license.

File Name:

   secret.rs

Abstract:

    File contains provisioning of the image encryption secret.

--*/

use base64::{engine::general_purpose::STANDARD, Engine};
use fwimage_types::*;
use rand::RngCore;
use rsa::RsaPublicKey;
use zeroize::Zeroizing;

use crate::tlv::classify_enc_secret;
use crate::{ImageGenError, ImageGenResult, ImageGeneratorCrypto};

/// Public key the image secret is wrapped under
#[derive(Debug, Clone)]
pub enum ImageEncKey {
    /// RSA-OAEP
    Rsa(RsaPublicKey),

    /// ECIES over P-256
    Ec256(p256::PublicKey),

    /// AES-128 key-encryption key
    Kek(Zeroizing<[u8; IMAGE_SECRET_BYTE_SIZE]>),
}

/// How the image body is encrypted
#[derive(Debug, Clone)]
pub enum ImageEncryption {
    /// A fresh secret is generated and wrapped under the key; the wrapped
    /// secret travels in the image.
    Wrapped(ImageEncKey),

    /// The loader looks the secret up in hardware by index. The secret, if
    /// given, is the base64 encoding of the plaintext key and is only used
    /// to encrypt the body.
    HwKeyIndex { index: u32, secret: Option<String> },
}

/// Secrets resolved for a single image build
#[derive(Default)]
pub struct ImageSecrets {
    pub hw_key_index: Option<u32>,

    pub nonce: Option<[u8; IMAGE_NONCE_BYTE_SIZE]>,

    pub plain_secret: Option<Zeroizing<Vec<u8>>>,

    pub cipher_secret: Option<Vec<u8>>,
}

/// Generate a random image-encrypting secret
pub fn generate_plain_secret<R: RngCore>(rng: &mut R) -> Zeroizing<Vec<u8>> {
    let mut secret = Zeroizing::new(vec![0u8; IMAGE_SECRET_BYTE_SIZE]);
    rng.fill_bytes(&mut secret);
    secret
}

/// Derive the AES nonce from the digest of the (padded) body
pub fn derive_nonce<Crypto: ImageGeneratorCrypto>(
    crypto: &Crypto,
    body: &[u8],
) -> ImageGenResult<[u8; IMAGE_NONCE_BYTE_SIZE]> {
    let digest = crypto.sha256_digest(body)?;
    let mut nonce = [0u8; IMAGE_NONCE_BYTE_SIZE];
    nonce.copy_from_slice(&digest[..IMAGE_NONCE_BYTE_SIZE]);
    Ok(nonce)
}

fn decode_hw_secret(encoded: &str) -> ImageGenResult<Zeroizing<Vec<u8>>> {
    let secret = Zeroizing::new(STANDARD.decode(encoded.trim())?);
    match secret.len() {
        16 | 32 => Ok(secret),
        len => Err(ImageGenError::InvalidSecretLength(len)),
    }
}

/// Resolve the secrets needed to encrypt `body`.
pub fn provision<Crypto: ImageGeneratorCrypto>(
    crypto: &Crypto,
    encryption: Option<&ImageEncryption>,
    body: &[u8],
    rng: &mut Crypto::Rng,
) -> ImageGenResult<ImageSecrets> {
    let Some(encryption) = encryption else {
        return Ok(ImageSecrets::default());
    };

    match encryption {
        ImageEncryption::Wrapped(key) => {
            let plain_secret = generate_plain_secret(rng);
            let cipher_secret = crypto.wrap_secret(&plain_secret, key, rng)?;

            // Catch a wrapper/TLV size disagreement before anything is signed
            classify_enc_secret(cipher_secret.len())?;
            log::debug!("Wrapped image secret into {} bytes", cipher_secret.len());

            Ok(ImageSecrets {
                plain_secret: Some(plain_secret),
                cipher_secret: Some(cipher_secret),
                ..Default::default()
            })
        }

        ImageEncryption::HwKeyIndex { index, secret } => {
            let nonce = derive_nonce(crypto, body)?;
            let plain_secret = secret.as_deref().map(decode_hw_secret).transpose()?;
            log::debug!(
                "Using hardware key index {index}, nonce {}",
                hex::encode(nonce)
            );

            Ok(ImageSecrets {
                hw_key_index: Some(*index),
                nonce: Some(nonce),
                plain_secret,
                cipher_secret: None,
            })
        }
    }
}
