// Licensed under the Apache-2.0 license

use fwimage_types::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::{ImageEncKey, ImageGeneratorCrypto, ImageGeneratorHasher};

/// Stand-in backend: real SHA-256, a seeded RNG, and a reversible XOR in
/// place of AES so generator output can be checked without a cipher.
pub struct TestCrypto {
    wrap_len: usize,
}

impl Default for TestCrypto {
    fn default() -> Self {
        Self::with_wrap_len(IMAGE_ENC_KEK_BYTE_SIZE)
    }
}

impl TestCrypto {
    /// Wrapped secrets come back `wrap_len` bytes long
    pub fn with_wrap_len(wrap_len: usize) -> Self {
        Self { wrap_len }
    }
}

pub struct TestHasher(Sha256);

impl ImageGeneratorHasher for TestHasher {
    type Output = ImageDigest;

    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish(self) -> Self::Output {
        self.0.finalize().into()
    }
}

/// XOR `data` with the key, then the nonce, repeated. Its own inverse.
pub fn xor_with_key(key: &[u8], nonce: Option<&[u8]>, data: &[u8]) -> Vec<u8> {
    let nonce = nonce.unwrap_or(&[0]);
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()] ^ nonce[i % nonce.len()])
        .collect()
}

impl ImageGeneratorCrypto for TestCrypto {
    type Sha256Hasher = TestHasher;

    type Rng = ChaCha20Rng;

    fn sha256_start(&self) -> Self::Sha256Hasher {
        TestHasher(Sha256::new())
    }

    fn rng(&self) -> Self::Rng {
        ChaCha20Rng::seed_from_u64(0x1234)
    }

    fn aes_ctr_encrypt(
        &self,
        key: &[u8],
        nonce: Option<&[u8]>,
        data: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        Ok(xor_with_key(key, nonce, data))
    }

    fn wrap_secret(
        &self,
        _secret: &[u8],
        _key: &ImageEncKey,
        rng: &mut Self::Rng,
    ) -> anyhow::Result<Vec<u8>> {
        let mut wrapped = vec![0u8; self.wrap_len];
        rng.fill_bytes(&mut wrapped);
        Ok(wrapped)
    }
}
