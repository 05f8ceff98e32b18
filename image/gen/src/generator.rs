/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Firmware image generator

--*/

use anyhow::anyhow;
use fwimage_types::*;

use crate::*;

/// Header and header padding; the protected size is not known yet.
struct Skeleton {
    header: ImageHeader,
    pad: Vec<u8>,
}

/// Protected TLVs generated and the protected size written to the header.
struct Protected {
    header: ImageHeader,
    pad: Vec<u8>,
    prot_tlvs: Vec<ImageTlv>,
}

/// Digest computed over the final header and the plaintext body.
struct Digested {
    header: ImageHeader,
    pad: Vec<u8>,
    prot_tlvs: Vec<ImageTlv>,
    body: Vec<u8>,
    digest: ImageDigest,
}

/// Body in its stored form, plaintext or ciphertext.
struct Sealed {
    header: ImageHeader,
    pad: Vec<u8>,
    prot_tlvs: Vec<ImageTlv>,
    body: Vec<u8>,
    digest: ImageDigest,
}

/// Pad `body` with 0xff up to the next multiple of `modulus`.
///
/// A body that is already a multiple of `modulus` is left unchanged.
pub fn pad_body(body: &mut Vec<u8>, modulus: usize) -> ImageGenResult<()> {
    if modulus == 0 {
        return Err(ImageGenError::InvalidPadModulus(modulus));
    }
    let rem = body.len() % modulus;
    if rem != 0 {
        body.resize(body.len() + modulus - rem, 0xff);
    }
    Ok(())
}

/// Image generator
pub struct ImageGenerator<Crypto: ImageGeneratorCrypto> {
    crypto: Crypto,
}

impl<Crypto: ImageGeneratorCrypto> ImageGenerator<Crypto> {
    /// Create an instance `ImageGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    /// Generate image
    ///
    /// # Arguments
    ///
    /// * `config` - Image generator configuration
    ///
    /// # Returns
    ///
    /// * `Image` - Signed, and optionally encrypted, firmware image
    pub fn generate(&self, config: &ImageGeneratorConfig) -> ImageGenResult<Image> {
        let mut rng = self.crypto.rng();

        let mut body = config.body.clone();
        if let Some(modulus) = config.image_pad {
            pad_body(&mut body, modulus)?;
        }

        let secrets = provision(&self.crypto, config.encryption.as_ref(), &body, &mut rng)?;

        let skeleton = self.gen_header(config, &secrets, body.len())?;
        let protected = self.gen_prot_tlvs(skeleton, config, &secrets)?;
        let digested = self.digest(protected, config.initial_hash.as_deref(), body)?;
        let sealed = self.encrypt(digested, &secrets)?;
        let image = self.gen_tlvs(sealed, config, &secrets, &mut rng)?;

        log::info!(
            "Generated image {} ({} bytes, flags {:#x}, {} signature(s))",
            image.header().version(),
            image.total_size(),
            image.header().flags(),
            config.sig_keys.len()
        );

        Ok(image)
    }

    /// Generate the header and its padding
    fn gen_header(
        &self,
        config: &ImageGeneratorConfig,
        secrets: &ImageSecrets,
        body_len: usize,
    ) -> ImageGenResult<Skeleton> {
        let mut header = ImageHeader::new();
        header.set_img_sz(
            u32::try_from(body_len).map_err(|_| ImageGenError::BodyTooLarge(body_len))?,
        );
        header.set_version(config.version);

        let mut flags = 0;
        if config.initial_hash.is_some() {
            flags |= IMAGE_F_NON_BOOTABLE;
        }
        if secrets.cipher_secret.is_some() && secrets.hw_key_index.is_none() {
            flags |= IMAGE_F_ENCRYPTED;
        }
        header.set_flags(flags);

        // Anything past the fixed header is zero padding reserved for the
        // loader.
        let header_size = config.header_size.unwrap_or(IMAGE_HEADER_SIZE);
        if header_size < IMAGE_HEADER_SIZE {
            return Err(ImageGenError::HeaderTooSmall {
                requested: header_size,
                min: IMAGE_HEADER_SIZE,
            });
        }
        header.set_hdr_sz(
            u16::try_from(header_size).map_err(|_| ImageGenError::HeaderTooLarge(header_size))?,
        );
        let pad = vec![0u8; header_size - IMAGE_HEADER_SIZE];

        log::debug!(
            "Image header: size {header_size}, body {body_len} bytes, flags {flags:#x}"
        );

        Ok(Skeleton { header, pad })
    }

    /// Generate the protected TLVs and finalize the protected size
    fn gen_prot_tlvs(
        &self,
        skeleton: Skeleton,
        config: &ImageGeneratorConfig,
        secrets: &ImageSecrets,
    ) -> ImageGenResult<Protected> {
        let Skeleton { mut header, pad } = skeleton;
        let mut prot_tlvs = vec![];

        if let Some(index) = secrets.hw_key_index {
            prot_tlvs.push(hw_key_index_tlv(index, config.use_legacy_tlv));

            let nonce = secrets
                .nonce
                .ok_or_else(|| anyhow!("hardware key index configured without a nonce"))?;
            prot_tlvs.push(nonce_tlv(&nonce, config.use_legacy_tlv)?);
        }

        for section in &config.sections {
            prot_tlvs.push(section_tlv(section)?);
        }

        header.set_prot_sz(calc_prot_size(&prot_tlvs)?);
        log::debug!(
            "{} protected TLV(s), protected size {}",
            prot_tlvs.len(),
            header.prot_sz()
        );

        Ok(Protected {
            header,
            pad,
            prot_tlvs,
        })
    }

    /// Calculate the image digest over the plaintext body
    fn digest(
        &self,
        protected: Protected,
        initial_hash: Option<&[u8]>,
        body: Vec<u8>,
    ) -> ImageGenResult<Digested> {
        let Protected {
            header,
            pad,
            prot_tlvs,
        } = protected;

        let digest = calc_hash(
            &self.crypto,
            initial_hash,
            &header,
            &pad,
            &body,
            &prot_tlvs,
        )?;
        log::debug!("Image digest {}", hex::encode(digest));

        Ok(Digested {
            header,
            pad,
            prot_tlvs,
            body,
            digest,
        })
    }

    /// Encrypt the body if a plaintext secret is available
    fn encrypt(&self, digested: Digested, secrets: &ImageSecrets) -> ImageGenResult<Sealed> {
        let Digested {
            header,
            pad,
            prot_tlvs,
            body,
            digest,
        } = digested;

        let body = match &secrets.plain_secret {
            Some(secret) => {
                let nonce = secrets.nonce.as_ref().map(|nonce| nonce.as_slice());
                let enc_body = self.crypto.aes_ctr_encrypt(secret, nonce, &body)?;
                if enc_body.len() != body.len() {
                    return Err(anyhow!(
                        "encrypted body is {} bytes, expected {}",
                        enc_body.len(),
                        body.len()
                    )
                    .into());
                }
                log::debug!("Encrypted {} byte image body", enc_body.len());
                enc_body
            }
            None => body,
        };

        Ok(Sealed {
            header,
            pad,
            prot_tlvs,
            body,
            digest,
        })
    }

    /// Generate the trailing TLVs
    fn gen_tlvs(
        &self,
        sealed: Sealed,
        config: &ImageGeneratorConfig,
        secrets: &ImageSecrets,
        rng: &mut Crypto::Rng,
    ) -> ImageGenResult<Image> {
        let Sealed {
            header,
            pad,
            prot_tlvs,
            body,
            digest,
        } = sealed;

        let mut tlvs = vec![digest_tlv(&digest)];
        tlvs.extend(build_sig_tlvs(&config.sig_keys, &digest, rng)?);

        if secrets.hw_key_index.is_none() {
            if let Some(cipher_secret) = &secrets.cipher_secret {
                tlvs.push(enc_tlv(cipher_secret)?);
            }
        }

        let tlv_tot_len = calc_tlv_tot_len(&tlvs)?;
        log::debug!("{} trailing TLV(s), total length {tlv_tot_len}", tlvs.len());

        Ok(Image::new(header, pad, body, prot_tlvs, tlvs))
    }
}
