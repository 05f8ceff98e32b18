/*++

Licensed under the Apache-2.0 license.

File Name:

   rustcrypto.rs

Abstract:

    File contains the RustCrypto backend of the image generator.

--*/

use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use aes::{Aes128, Aes256};
use anyhow::{anyhow, bail};
use fwimage_gen::{ImageEncKey, ImageGeneratorCrypto, ImageGeneratorHasher};
use fwimage_types::*;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rsa::Oaep;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

const AES_BLOCK_SIZE: usize = 16;
const ECIES_INFO: &[u8] = b"MCUBoot_ECIES_v1";
const ECIES_AES_KEY_SIZE: usize = 16;
const ECIES_MAC_KEY_SIZE: usize = 32;
const KEY_WRAP_IV: [u8; 8] = [0xa6; 8];

#[derive(Default)]
pub struct RustCrypto {
    seed: Option<u64>,
}

impl RustCrypto {
    /// Backend whose randomness is replayed from `seed`; for reproducible
    /// builds and tests only.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

pub struct RustCryptoSha256Hasher(Sha256);

impl ImageGeneratorHasher for RustCryptoSha256Hasher {
    type Output = ImageDigest;

    fn update(&mut self, data: &[u8]) {
        self.0.update(data)
    }

    fn finish(self) -> Self::Output {
        self.0.finalize().into()
    }
}

impl ImageGeneratorCrypto for RustCrypto {
    type Sha256Hasher = RustCryptoSha256Hasher;

    type Rng = ChaCha20Rng;

    fn sha256_start(&self) -> Self::Sha256Hasher {
        RustCryptoSha256Hasher(Sha256::default())
    }

    fn rng(&self) -> Self::Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }

    fn aes_ctr_encrypt(
        &self,
        key: &[u8],
        nonce: Option<&[u8]>,
        data: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let mut iv = [0u8; AES_BLOCK_SIZE];
        if let Some(nonce) = nonce {
            if nonce.len() > iv.len() {
                bail!("AES nonce too long: {} bytes", nonce.len());
            }
            iv[..nonce.len()].copy_from_slice(nonce);
        }

        let mut out = data.to_vec();
        match key.len() {
            16 => aes_ctr::<Aes128Ctr>(key, &iv, &mut out)?,
            32 => aes_ctr::<Aes256Ctr>(key, &iv, &mut out)?,
            len => bail!("Unsupported AES key length: {len} bytes"),
        }
        Ok(out)
    }

    fn wrap_secret(
        &self,
        secret: &[u8],
        key: &ImageEncKey,
        rng: &mut Self::Rng,
    ) -> anyhow::Result<Vec<u8>> {
        match key {
            ImageEncKey::Rsa(pub_key) => Ok(pub_key.encrypt(rng, Oaep::new::<Sha256>(), secret)?),
            ImageEncKey::Ec256(pub_key) => ecies_p256_wrap(secret, pub_key, rng),
            ImageEncKey::Kek(kek) => aes_key_wrap(kek.as_slice(), secret),
        }
    }
}

fn aes_ctr<C: KeyIvInit + StreamCipher>(key: &[u8], iv: &[u8], data: &mut [u8]) -> anyhow::Result<()> {
    C::new_from_slices(key, iv)
        .map_err(|_| anyhow!("Invalid AES key length: {} bytes", key.len()))?
        .apply_keystream(data);
    Ok(())
}

/// ECIES over P-256: ephemeral ECDH, HKDF-SHA256, AES-128-CTR and
/// HMAC-SHA256.
///
/// Output is the uncompressed ephemeral point, the tag, then the ciphertext.
fn ecies_p256_wrap<R: RngCore + CryptoRng>(
    secret: &[u8],
    pub_key: &p256::PublicKey,
    rng: &mut R,
) -> anyhow::Result<Vec<u8>> {
    let ephemeral = p256::ecdh::EphemeralSecret::random(rng);
    let point = ephemeral.public_key().to_encoded_point(false);
    let shared = ephemeral.diffie_hellman(pub_key);

    let mut okm = Zeroizing::new([0u8; ECIES_AES_KEY_SIZE + ECIES_MAC_KEY_SIZE]);
    Hkdf::<Sha256>::new(None, shared.raw_secret_bytes())
        .expand(ECIES_INFO, okm.as_mut_slice())
        .map_err(|e| anyhow!("ECIES key derivation failed: {e}"))?;
    let (aes_key, mac_key) = okm.split_at(ECIES_AES_KEY_SIZE);

    let mut cipher_secret = secret.to_vec();
    aes_ctr::<Aes128Ctr>(aes_key, &[0u8; AES_BLOCK_SIZE], &mut cipher_secret)?;

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(mac_key)
        .map_err(|e| anyhow!("ECIES MAC key rejected: {e}"))?;
    mac.update(&cipher_secret);
    let tag = mac.finalize().into_bytes();

    let mut wrapped = Vec::with_capacity(IMAGE_ENC_EC256_BYTE_SIZE);
    wrapped.extend_from_slice(point.as_bytes());
    wrapped.extend_from_slice(&tag);
    wrapped.extend_from_slice(&cipher_secret);
    Ok(wrapped)
}

/// AES-128 key wrap (RFC 3394)
pub fn aes_key_wrap(kek: &[u8], plain: &[u8]) -> anyhow::Result<Vec<u8>> {
    if plain.len() < 16 || plain.len() % 8 != 0 {
        bail!("Key wrap input must be a multiple of 8 bytes, at least 16");
    }
    let cipher = Aes128::new_from_slice(kek)
        .map_err(|_| anyhow!("Invalid KEK length: {} bytes", kek.len()))?;

    let mut a = KEY_WRAP_IV;
    let mut r: Vec<[u8; 8]> = plain
        .chunks_exact(8)
        .map(|chunk| {
            let mut block = [0u8; 8];
            block.copy_from_slice(chunk);
            block
        })
        .collect();

    let n = r.len();
    for j in 0..6 {
        for (i, r_i) in r.iter_mut().enumerate() {
            let mut block = aes::Block::default();
            block[..8].copy_from_slice(&a);
            block[8..].copy_from_slice(r_i);
            cipher.encrypt_block(&mut block);

            let t = ((n * j + i + 1) as u64).to_be_bytes();
            for (a, (b, t)) in a.iter_mut().zip(block[..8].iter().zip(t)) {
                *a = b ^ t;
            }
            r_i.copy_from_slice(&block[8..]);
        }
    }

    let mut wrapped = Vec::with_capacity((n + 1) * 8);
    wrapped.extend_from_slice(&a);
    r.iter().for_each(|r_i| wrapped.extend_from_slice(r_i));
    Ok(wrapped)
}
