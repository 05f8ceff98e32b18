/*++

Licensed under the Apache-2.0 license.

File Name:

   error.rs

Abstract:

    File contains the error type returned by the image generator.

--*/

use thiserror::Error;

pub type ImageGenResult<T> = Result<T, ImageGenError>;

/// Image generation errors
#[derive(Error, Debug)]
pub enum ImageGenError {
    #[error("image header must be at least {min} bytes, requested {requested}")]
    HeaderTooSmall { requested: usize, min: usize },

    #[error("image header size {0} does not fit the header size field")]
    HeaderTooLarge(usize),

    #[error("image body of {0} bytes does not fit the image size field")]
    BodyTooLarge(usize),

    #[error("invalid image pad modulus {0}")]
    InvalidPadModulus(usize),

    #[error("protected TLV region of {0} bytes does not fit the protected size field")]
    ProtectedRegionTooLarge(usize),

    #[error("trailing TLV region of {0} bytes does not fit the trailer length field")]
    TrailerTooLarge(usize),

    #[error("TLV type {r#type:#04x} payload of {len} bytes exceeds the TLV length field")]
    TlvTooLarge { r#type: u8, len: usize },

    #[error("invalid enc TLV size: {0}")]
    InvalidEncTlvSize(usize),

    #[error("unsupported RSA modulus size: {0} bytes")]
    UnsupportedRsaModulus(usize),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("signature truncated: {len} bytes exceeds the {max} byte slot")]
    SignatureTruncated { len: usize, max: usize },

    #[error("ed25519 signature has wrong length: have={have} want={want}")]
    Ed25519SignatureLength { have: usize, want: usize },

    #[error("invalid image secret length: {0} bytes")]
    InvalidSecretLength(usize),

    #[error("failed to compute signature")]
    Signature(#[from] ecdsa::signature::Error),

    #[error("failed to compute RSA signature")]
    Rsa(#[from] rsa::Error),

    #[error("failed to encode public key")]
    KeyEncoding(#[from] spki::Error),

    #[error("failed to encode RSA public key")]
    RsaKeyEncoding(#[from] rsa::pkcs1::Error),

    #[error("failed to decode image secret")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Crypto(#[from] anyhow::Error),
}
