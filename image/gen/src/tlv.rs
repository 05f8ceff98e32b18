/*++

Licensed under the Apache-2.0 license.

File Name:

   tlv.rs

Abstract:

    File contains constructors for the image TLV records.

--*/

use fwimage_types::*;
use sha2::{Digest, Sha256};

use crate::{ImageGenError, ImageGenResult};

fn tlv(r#type: u8, data: Vec<u8>) -> ImageGenResult<ImageTlv> {
    if data.len() > u16::MAX as usize {
        return Err(ImageGenError::TlvTooLarge {
            r#type,
            len: data.len(),
        });
    }
    Ok(ImageTlv::new(r#type, data))
}

/// Create a hardware key index TLV
pub fn hw_key_index_tlv(index: u32, use_legacy_tlv: bool) -> ImageTlv {
    let r#type = if use_legacy_tlv {
        IMAGE_TLV_SECRET_ID_LEGACY
    } else {
        IMAGE_TLV_SECRET_ID
    };
    ImageTlv::new(r#type, index.to_le_bytes().to_vec())
}

/// Create a nonce TLV
pub fn nonce_tlv(nonce: &[u8], use_legacy_tlv: bool) -> ImageGenResult<ImageTlv> {
    let r#type = if use_legacy_tlv {
        IMAGE_TLV_AES_NONCE_LEGACY
    } else {
        IMAGE_TLV_AES_NONCE
    };
    tlv(r#type, nonce.to_vec())
}

/// Select the encryption-secret TLV type from the wrapped secret length.
///
/// The length is the only discriminator between the wrapping schemes.
pub fn classify_enc_secret(len: usize) -> ImageGenResult<u8> {
    match len {
        IMAGE_ENC_RSA_BYTE_SIZE => Ok(IMAGE_TLV_ENC_RSA),
        IMAGE_ENC_EC256_BYTE_SIZE => Ok(IMAGE_TLV_ENC_EC256),
        IMAGE_ENC_KEK_BYTE_SIZE => Ok(IMAGE_TLV_ENC_KEK),
        _ => Err(ImageGenError::InvalidEncTlvSize(len)),
    }
}

/// Create an encryption-secret TLV from a wrapped secret
pub fn enc_tlv(cipher_secret: &[u8]) -> ImageGenResult<ImageTlv> {
    let r#type = classify_enc_secret(cipher_secret.len())?;
    tlv(r#type, cipher_secret.to_vec())
}

/// Create a section TLV
pub fn section_tlv(section: &ImageSection) -> ImageGenResult<ImageTlv> {
    let mut data = Vec::with_capacity(8 + section.name.len());
    data.extend_from_slice(&section.offset.to_le_bytes());
    data.extend_from_slice(&section.size.to_le_bytes());
    data.extend_from_slice(section.name.as_bytes());
    tlv(IMAGE_TLV_SECTION, data)
}

/// Compute the short identifier of a public key
pub fn key_hash(pub_key: &[u8]) -> [u8; IMAGE_KEY_HASH_BYTE_SIZE] {
    let digest = Sha256::digest(pub_key);
    let mut hash = [0u8; IMAGE_KEY_HASH_BYTE_SIZE];
    hash.copy_from_slice(&digest[..IMAGE_KEY_HASH_BYTE_SIZE]);
    hash
}

/// Create a key-hash TLV from the raw public key bytes
pub fn key_hash_tlv(pub_key: &[u8]) -> ImageTlv {
    ImageTlv::new(IMAGE_TLV_KEYHASH, key_hash(pub_key).to_vec())
}

/// Create the image digest TLV
pub fn digest_tlv(digest: &ImageDigest) -> ImageTlv {
    ImageTlv::new(IMAGE_TLV_SHA256, digest.to_vec())
}
