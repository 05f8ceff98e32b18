/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the firmware image generator.

--*/

mod digest;
mod error;
mod generator;
mod secret;
mod sign;
mod tlv;

#[cfg(test)]
mod test_crypto;
#[cfg(test)]
mod test_keys;

pub use digest::{calc_hash, calc_prot_size, calc_tlv_tot_len};
pub use error::{ImageGenError, ImageGenResult};
pub use generator::{pad_body, ImageGenerator};
pub use secret::{
    derive_nonce, generate_plain_secret, provision, ImageEncKey, ImageEncryption, ImageSecrets,
};
pub use sign::{build_sig_tlvs, generate_sig, ImagePubKey, ImageSignature, ImageSigningKey, SigType};
pub use tlv::{
    classify_enc_secret, digest_tlv, enc_tlv, hw_key_index_tlv, key_hash, key_hash_tlv,
    nonce_tlv, section_tlv,
};

use fwimage_types::*;
use rand::{CryptoRng, RngCore};

pub trait ImageGeneratorHasher {
    type Output: Copy;

    fn update(&mut self, data: &[u8]);

    fn finish(self) -> Self::Output;
}

/// Image Generator Crypto Trait
///
/// Everything the generator needs from a crypto backend that is not part of
/// the image format itself.
pub trait ImageGeneratorCrypto {
    type Sha256Hasher: ImageGeneratorHasher<Output = ImageDigest>;

    type Rng: RngCore + CryptoRng;

    fn sha256_start(&self) -> Self::Sha256Hasher;

    /// Calculate SHA-256 digest
    fn sha256_digest(&self, data: &[u8]) -> anyhow::Result<ImageDigest> {
        let mut hasher = self.sha256_start();
        hasher.update(data);
        Ok(hasher.finish())
    }

    /// Source of randomness for secrets and signatures
    fn rng(&self) -> Self::Rng;

    /// Encrypt `data` with AES in counter mode.
    ///
    /// The counter block starts as `nonce` followed by zeros (all zeros when
    /// there is no nonce). The output is the same length as `data`.
    fn aes_ctr_encrypt(
        &self,
        key: &[u8],
        nonce: Option<&[u8]>,
        data: &[u8],
    ) -> anyhow::Result<Vec<u8>>;

    /// Wrap the image secret under a key-encryption key
    fn wrap_secret(
        &self,
        secret: &[u8],
        key: &ImageEncKey,
        rng: &mut Self::Rng,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Image Generator Configuration
#[derive(Default)]
pub struct ImageGeneratorConfig {
    /// Image body
    pub body: Vec<u8>,

    pub version: ImageVersion,

    pub sig_keys: Vec<ImageSigningKey>,

    pub sections: Vec<ImageSection>,

    /// Digest of a preceding loader image; marks the image non-bootable
    pub initial_hash: Option<Vec<u8>>,

    /// Header size including padding; defaults to `IMAGE_HEADER_SIZE`
    pub header_size: Option<usize>,

    /// Pad the body with 0xff to a multiple of this many bytes
    pub image_pad: Option<usize>,

    pub use_legacy_tlv: bool,

    pub encryption: Option<ImageEncryption>,
}
