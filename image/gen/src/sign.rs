/*++

Licensed under the Apache-2.0 license.

File Name:

   sign.rs

Abstract:

    File contains the signing keys and signature generation for images.

--*/

use ecdsa::signature::hazmat::RandomizedPrehashSigner;
use ed25519_dalek::Signer;
use fwimage_types::*;
use rand::{CryptoRng, RngCore};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use spki::EncodePublicKey;

use crate::tlv::{key_hash, key_hash_tlv};
use crate::{ImageGenError, ImageGenResult};

/// Signature algorithm, as declared by a public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigType {
    Rsa2048,
    Rsa3072,
    EcdsaP224,
    EcdsaP256,
    Ed25519,
}

impl SigType {
    /// TLV type code of the signature record
    pub fn tlv_type(self) -> u8 {
        match self {
            SigType::Rsa2048 => IMAGE_TLV_RSA2048,
            SigType::Rsa3072 => IMAGE_TLV_RSA3072,
            SigType::EcdsaP224 => IMAGE_TLV_ECDSA224,
            SigType::EcdsaP256 => IMAGE_TLV_ECDSA256,
            SigType::Ed25519 => IMAGE_TLV_ED25519,
        }
    }

    /// Largest signature the loader reserves room for
    pub fn max_sig_len(self) -> usize {
        match self {
            SigType::Rsa2048 => 256,
            SigType::Rsa3072 => 384,
            SigType::EcdsaP224 => 68,
            SigType::EcdsaP256 => 72,
            SigType::Ed25519 => ed25519_dalek::SIGNATURE_LENGTH,
        }
    }
}

/// Image signing key
pub enum ImageSigningKey {
    Rsa(Box<RsaPrivateKey>),
    EcdsaP224(p224::ecdsa::SigningKey),
    EcdsaP256(p256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// Public half of an image signing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePubKey {
    Rsa(RsaPublicKey),
    EcdsaP224(p224::PublicKey),
    EcdsaP256(p256::PublicKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl ImageSigningKey {
    pub fn pub_key(&self) -> ImagePubKey {
        match self {
            ImageSigningKey::Rsa(key) => ImagePubKey::Rsa(key.to_public_key()),
            ImageSigningKey::EcdsaP224(key) => ImagePubKey::EcdsaP224(key.verifying_key().into()),
            ImageSigningKey::EcdsaP256(key) => ImagePubKey::EcdsaP256(key.verifying_key().into()),
            ImageSigningKey::Ed25519(key) => ImagePubKey::Ed25519(key.verifying_key()),
        }
    }
}

impl ImagePubKey {
    /// Signature type implied by the key
    pub fn sig_type(&self) -> ImageGenResult<SigType> {
        match self {
            ImagePubKey::Rsa(key) => match key.size() {
                256 => Ok(SigType::Rsa2048),
                384 => Ok(SigType::Rsa3072),
                size => Err(ImageGenError::UnsupportedRsaModulus(size)),
            },
            ImagePubKey::EcdsaP224(_) => Ok(SigType::EcdsaP224),
            ImagePubKey::EcdsaP256(_) => Ok(SigType::EcdsaP256),
            ImagePubKey::Ed25519(_) => Ok(SigType::Ed25519),
        }
    }

    /// Raw key encoding the key hash is computed over: PKCS#1 for RSA,
    /// SubjectPublicKeyInfo for everything else.
    pub fn to_bytes(&self) -> ImageGenResult<Vec<u8>> {
        let der = match self {
            ImagePubKey::Rsa(key) => key.to_pkcs1_der()?.as_bytes().to_vec(),
            ImagePubKey::EcdsaP224(key) => key.to_public_key_der()?.as_bytes().to_vec(),
            ImagePubKey::EcdsaP256(key) => key.to_public_key_der()?.as_bytes().to_vec(),
            ImagePubKey::Ed25519(key) => key.to_public_key_der()?.as_bytes().to_vec(),
        };
        Ok(der)
    }
}

/// Image signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSignature {
    pub sig_type: SigType,

    pub key_hash: [u8; IMAGE_KEY_HASH_BYTE_SIZE],

    pub data: Vec<u8>,
}

fn check_ecdsa_len(sig_type: SigType, der: &[u8]) -> ImageGenResult<Vec<u8>> {
    let max = sig_type.max_sig_len();
    if der.len() > max {
        return Err(ImageGenError::SignatureTruncated {
            len: der.len(),
            max,
        });
    }
    Ok(der.to_vec())
}

/// Sign an image digest.
///
/// The digest is signed as-is; none of the algorithms hash it again.
pub fn generate_sig<R>(
    key: &ImageSigningKey,
    digest: &ImageDigest,
    rng: &mut R,
) -> ImageGenResult<ImageSignature>
where
    R: RngCore + CryptoRng,
{
    let pub_key = key.pub_key();
    let sig_type = pub_key.sig_type()?;

    let data = match key {
        ImageSigningKey::Rsa(key) => key.sign_with_rng(
            rng,
            Pss::new_with_salt::<Sha256>(SHA256_DIGEST_BYTE_SIZE),
            digest,
        )?,

        ImageSigningKey::EcdsaP224(key) => {
            let sig: p224::ecdsa::Signature = key.sign_prehash_with_rng(rng, digest)?;
            check_ecdsa_len(sig_type, sig.to_der().as_bytes())?
        }

        ImageSigningKey::EcdsaP256(key) => {
            let sig: p256::ecdsa::Signature = key.sign_prehash_with_rng(rng, digest)?;
            check_ecdsa_len(sig_type, sig.to_der().as_bytes())?
        }

        ImageSigningKey::Ed25519(key) => {
            let sig = key.sign(digest).to_bytes();
            if sig.len() != ed25519_dalek::SIGNATURE_LENGTH {
                return Err(ImageGenError::Ed25519SignatureLength {
                    have: sig.len(),
                    want: ed25519_dalek::SIGNATURE_LENGTH,
                });
            }
            sig.to_vec()
        }
    };

    Ok(ImageSignature {
        sig_type,
        key_hash: key_hash(&pub_key.to_bytes()?),
        data,
    })
}

/// Sign an image digest with every key, producing a key-hash TLV followed by
/// a signature TLV per key, in key order.
pub fn build_sig_tlvs<R>(
    keys: &[ImageSigningKey],
    digest: &ImageDigest,
    rng: &mut R,
) -> ImageGenResult<Vec<ImageTlv>>
where
    R: RngCore + CryptoRng,
{
    let mut tlvs = Vec::with_capacity(keys.len() * 2);

    for key in keys {
        let pub_key = key.pub_key().to_bytes()?;
        tlvs.push(key_hash_tlv(&pub_key));

        let sig = generate_sig(key, digest, rng)?;
        log::debug!(
            "Signed image digest with {:?} key {}",
            sig.sig_type,
            hex::encode(sig.key_hash)
        );
        tlvs.push(ImageTlv::new(sig.sig_type.tlv_type(), sig.data));
    }

    Ok(tlvs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::*;
    use ecdsa::signature::hazmat::PrehashVerifier;
    use ed25519_dalek::Verifier;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const DIGEST: ImageDigest = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff, 0x0f, 0x1e, 0x2d, 0x3c, 0x4b, 0x5a, 0x69, 0x78, 0x87, 0x96, 0xa5, 0xb4, 0xc3, 0xd2,
        0xe1, 0xf0,
    ];

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_sig_type() {
        assert_eq!(rsa2048().pub_key().sig_type().unwrap(), SigType::Rsa2048);
        assert_eq!(rsa3072().pub_key().sig_type().unwrap(), SigType::Rsa3072);
        assert_eq!(p224().pub_key().sig_type().unwrap(), SigType::EcdsaP224);
        assert_eq!(p256().pub_key().sig_type().unwrap(), SigType::EcdsaP256);
        assert_eq!(ed25519().pub_key().sig_type().unwrap(), SigType::Ed25519);
    }

    #[test]
    fn test_unsupported_rsa_modulus() {
        let key = rsa1024();
        assert!(matches!(
            key.pub_key().sig_type(),
            Err(ImageGenError::UnsupportedRsaModulus(128))
        ));
        assert!(matches!(
            generate_sig(&key, &DIGEST, &mut rng()),
            Err(ImageGenError::UnsupportedRsaModulus(128))
        ));
    }

    #[test]
    fn test_ecdsa_sig_len_limit() {
        for (sig_type, max) in [(SigType::EcdsaP224, 68), (SigType::EcdsaP256, 72)] {
            let der = vec![0x30u8; max];
            assert_eq!(check_ecdsa_len(sig_type, &der).unwrap(), der);

            let der = vec![0x30u8; max + 1];
            assert!(matches!(
                check_ecdsa_len(sig_type, &der),
                Err(ImageGenError::SignatureTruncated { len, max: limit })
                    if len == max + 1 && limit == max
            ));
        }
    }

    #[test]
    fn test_key_hashes() {
        // SHA-256 prefixes of the DER public keys, as produced by
        // `openssl rsa -RSAPublicKey_out` / `openssl pkey -pubout`.
        let hash = |key: ImageSigningKey| key_hash(&key.pub_key().to_bytes().unwrap());
        assert_eq!(hash(rsa2048()), [0x59u8, 0xbe, 0xb1, 0x9b]);
        assert_eq!(hash(p224()), [0xe9u8, 0xe8, 0x83, 0xe3]);
        assert_eq!(hash(p256()), [0x7du8, 0xe9, 0x87, 0xfe]);
        assert_eq!(hash(ed25519()), [0x32u8, 0x93, 0x53, 0x2f]);
    }

    #[test]
    fn test_rsa_pss_round_trip() {
        for key in [rsa2048(), rsa3072()] {
            let sig = generate_sig(&key, &DIGEST, &mut rng()).unwrap();
            let ImagePubKey::Rsa(pub_key) = key.pub_key() else {
                panic!("not an RSA key");
            };
            assert_eq!(sig.data.len(), pub_key.size());
            pub_key
                .verify(Pss::new::<Sha256>(), &DIGEST, &sig.data)
                .unwrap();
        }
    }

    #[test]
    fn test_ecdsa_p224_round_trip() {
        let key = p224();
        let sig = generate_sig(&key, &DIGEST, &mut rng()).unwrap();
        assert_eq!(sig.sig_type, SigType::EcdsaP224);
        assert!(sig.data.len() <= SigType::EcdsaP224.max_sig_len());
        assert_eq!(sig.data[0], 0x30);

        let ImageSigningKey::EcdsaP224(signing_key) = &key else {
            panic!("not a P-224 key");
        };
        let der = p224::ecdsa::Signature::from_der(&sig.data).unwrap();
        signing_key
            .verifying_key()
            .verify_prehash(&DIGEST, &der)
            .unwrap();
    }

    #[test]
    fn test_ecdsa_p256_round_trip() {
        let key = p256();
        let sig = generate_sig(&key, &DIGEST, &mut rng()).unwrap();
        assert_eq!(sig.sig_type, SigType::EcdsaP256);
        assert!(sig.data.len() <= SigType::EcdsaP256.max_sig_len());

        let ImageSigningKey::EcdsaP256(signing_key) = &key else {
            panic!("not a P-256 key");
        };
        let der = p256::ecdsa::Signature::from_der(&sig.data).unwrap();
        signing_key
            .verifying_key()
            .verify_prehash(&DIGEST, &der)
            .unwrap();
    }

    #[test]
    fn test_ed25519_round_trip() {
        let key = ed25519();
        let sig = generate_sig(&key, &DIGEST, &mut rng()).unwrap();
        assert_eq!(sig.data.len(), 64);

        let ImagePubKey::Ed25519(pub_key) = key.pub_key() else {
            panic!("not an Ed25519 key");
        };
        let ed_sig = ed25519_dalek::Signature::from_slice(&sig.data).unwrap();
        pub_key.verify(&DIGEST, &ed_sig).unwrap();

        // Deterministic regardless of the RNG
        let again = generate_sig(&key, &DIGEST, &mut ChaCha20Rng::seed_from_u64(1)).unwrap();
        assert_eq!(sig, again);
    }

    #[test]
    fn test_build_sig_tlvs_order() {
        let keys = vec![ed25519(), p256(), rsa2048()];
        let tlvs = build_sig_tlvs(&keys, &DIGEST, &mut rng()).unwrap();

        let types: Vec<u8> = tlvs.iter().map(|tlv| tlv.r#type()).collect();
        assert_eq!(
            types,
            vec![
                IMAGE_TLV_KEYHASH,
                IMAGE_TLV_ED25519,
                IMAGE_TLV_KEYHASH,
                IMAGE_TLV_ECDSA256,
                IMAGE_TLV_KEYHASH,
                IMAGE_TLV_RSA2048,
            ]
        );
        assert_eq!(tlvs[0].data(), &[0x32u8, 0x93, 0x53, 0x2f]);
        assert_eq!(tlvs[2].data(), &[0x7du8, 0xe9, 0x87, 0xfe]);
        assert_eq!(tlvs[4].data(), &[0x59u8, 0xbe, 0xb1, 0x9b]);
        assert_eq!(tlvs[1].header().len(), 64);
        assert_eq!(tlvs[5].header().len(), 256);
    }

    #[test]
    fn test_build_sig_tlvs_no_keys() {
        assert!(build_sig_tlvs(&[], &DIGEST, &mut rng()).unwrap().is_empty());
    }
}
