/*++

Licensed under the Apache-2.0 license.

File Name:

   digest.rs

Abstract:

    File contains the image digest and protected region size calculations.

--*/

use fwimage_types::*;
use zerocopy::IntoBytes;

use crate::{ImageGenError, ImageGenResult, ImageGeneratorCrypto, ImageGeneratorHasher};

/// Calculate the size of the protected region: every protected TLV plus the
/// protected trailer, or zero when there are no protected TLVs.
pub fn calc_prot_size(prot_tlvs: &[ImageTlv]) -> ImageGenResult<u16> {
    let mut size: usize = prot_tlvs.iter().map(ImageTlv::size).sum();
    if size > 0 {
        size += IMAGE_TRAILER_SIZE;
    }
    u16::try_from(size).map_err(|_| ImageGenError::ProtectedRegionTooLarge(size))
}

/// Calculate the length recorded in the trailer: the trailer itself plus
/// every trailing TLV.
pub fn calc_tlv_tot_len(tlvs: &[ImageTlv]) -> ImageGenResult<u16> {
    let size = IMAGE_TRAILER_SIZE + tlvs.iter().map(ImageTlv::size).sum::<usize>();
    u16::try_from(size).map_err(|_| ImageGenError::TrailerTooLarge(size))
}

/// Calculate the image digest.
///
/// Covers, in order: the initial hash (if any), the header, the header
/// padding, the plaintext body, then the protected trailer and protected
/// TLVs (if any). `header` must already carry the final protected size.
pub fn calc_hash<Crypto: ImageGeneratorCrypto>(
    crypto: &Crypto,
    initial_hash: Option<&[u8]>,
    header: &ImageHeader,
    pad: &[u8],
    plain_body: &[u8],
    prot_tlvs: &[ImageTlv],
) -> ImageGenResult<ImageDigest> {
    let mut hasher = crypto.sha256_start();

    if let Some(initial_hash) = initial_hash {
        hasher.update(initial_hash);
    }

    hasher.update(header.as_bytes());
    hasher.update(pad);
    hasher.update(plain_body);

    if !prot_tlvs.is_empty() {
        let trailer = ImageTrailer::new(IMAGE_PROT_TRAILER_MAGIC, header.prot_sz());
        hasher.update(trailer.as_bytes());

        for tlv in prot_tlvs {
            hasher.update(tlv.header().as_bytes());
            hasher.update(tlv.data());
        }
    }

    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_crypto::TestCrypto;
    use sha2::{Digest, Sha256};

    fn prot_tlvs() -> Vec<ImageTlv> {
        vec![
            ImageTlv::new(IMAGE_TLV_SECRET_ID, vec![3, 0, 0, 0]),
            ImageTlv::new(IMAGE_TLV_AES_NONCE, vec![1, 2, 3, 4, 5, 6, 7, 8]),
        ]
    }

    fn header(prot_sz: u16) -> ImageHeader {
        let mut header = ImageHeader::new();
        header.set_hdr_sz(40);
        header.set_img_sz(5);
        header.set_prot_sz(prot_sz);
        header
    }

    #[test]
    fn test_calc_prot_size() {
        assert_eq!(calc_prot_size(&[]).unwrap(), 0);
        assert_eq!(
            calc_prot_size(&prot_tlvs()).unwrap(),
            (2 * IMAGE_TLV_SIZE + 12 + IMAGE_TRAILER_SIZE) as u16
        );

        let big = vec![ImageTlv::new(IMAGE_TLV_SECTION, vec![0; 0xfffc])];
        assert!(matches!(
            calc_prot_size(&big),
            Err(ImageGenError::ProtectedRegionTooLarge(0x10004))
        ));
    }

    #[test]
    fn test_calc_tlv_tot_len() {
        assert_eq!(calc_tlv_tot_len(&[]).unwrap(), IMAGE_TRAILER_SIZE as u16);
        assert_eq!(
            calc_tlv_tot_len(&prot_tlvs()).unwrap(),
            (2 * IMAGE_TLV_SIZE + 12 + IMAGE_TRAILER_SIZE) as u16
        );

        let big = vec![
            ImageTlv::new(IMAGE_TLV_ED25519, vec![0; 0x8000]),
            ImageTlv::new(IMAGE_TLV_ED25519, vec![0; 0x8000]),
        ];
        assert!(matches!(
            calc_tlv_tot_len(&big),
            Err(ImageGenError::TrailerTooLarge(0x1000c))
        ));
    }

    #[test]
    fn test_calc_hash_byte_sequence() {
        let crypto = TestCrypto::default();
        let tlvs = prot_tlvs();
        let header = header(calc_prot_size(&tlvs).unwrap());
        let pad = [0u8; 8];
        let body = b"hello";
        let initial = [0xeeu8; 32];

        let mut expected = Sha256::new();
        expected.update(initial);
        expected.update(header.as_bytes());
        expected.update(pad);
        expected.update(body);
        expected.update([0x08, 0x69, 24, 0]);
        expected.update([IMAGE_TLV_SECRET_ID, 0, 4, 0, 3, 0, 0, 0]);
        expected.update([IMAGE_TLV_AES_NONCE, 0, 8, 0, 1, 2, 3, 4, 5, 6, 7, 8]);
        let expected: ImageDigest = expected.finalize().into();

        let digest = calc_hash(&crypto, Some(&initial[..]), &header, &pad, body, &tlvs).unwrap();
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_calc_hash_without_protected_tlvs() {
        let crypto = TestCrypto::default();
        let header = header(0);

        let mut expected = Sha256::new();
        expected.update(header.as_bytes());
        expected.update(b"hello");
        let expected: ImageDigest = expected.finalize().into();

        assert_eq!(
            calc_hash(&crypto, None, &header, &[], b"hello", &[]).unwrap(),
            expected
        );
    }

    #[test]
    fn test_calc_hash_sensitivity() {
        let crypto = TestCrypto::default();
        let tlvs = prot_tlvs();
        let header = header(calc_prot_size(&tlvs).unwrap());
        let pad = [0u8; 8];
        let body = *b"hello";

        let base = calc_hash(&crypto, None, &header, &pad, &body, &tlvs).unwrap();

        let mut other = header;
        other.set_flags(IMAGE_F_NON_BOOTABLE);
        assert_ne!(base, calc_hash(&crypto, None, &other, &pad, &body, &tlvs).unwrap());

        let mut other_pad = pad;
        other_pad[7] = 1;
        assert_ne!(base, calc_hash(&crypto, None, &header, &other_pad, &body, &tlvs).unwrap());

        let mut other_body = body;
        other_body[0] ^= 0x80;
        assert_ne!(base, calc_hash(&crypto, None, &header, &pad, &other_body, &tlvs).unwrap());

        let mut other_tlvs = tlvs.clone();
        other_tlvs[1] = ImageTlv::new(IMAGE_TLV_AES_NONCE, vec![1, 2, 3, 4, 5, 6, 7, 9]);
        assert_ne!(base, calc_hash(&crypto, None, &header, &pad, &body, &other_tlvs).unwrap());

        let reordered: Vec<ImageTlv> = tlvs.iter().rev().cloned().collect();
        assert_ne!(base, calc_hash(&crypto, None, &header, &pad, &body, &reordered).unwrap());

        assert_ne!(
            base,
            calc_hash(&crypto, Some(&[0u8; 32][..]), &header, &pad, &body, &tlvs).unwrap()
        );
    }
}
