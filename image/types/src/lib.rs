/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures and wire constants for the firmware image.

--*/

use core::fmt;
use core::str::FromStr;

use getset::{CopyGetters, Getters};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const IMAGE_MAGIC: u32 = 0x96f3_b83d;
pub const IMAGE_HEADER_SIZE: usize = core::mem::size_of::<ImageHeader>();
pub const IMAGE_TLV_SIZE: usize = core::mem::size_of::<ImageTlvHeader>();
pub const IMAGE_TRAILER_SIZE: usize = core::mem::size_of::<ImageTrailer>();
pub const IMAGE_TRAILER_MAGIC: u16 = 0x6907;
pub const IMAGE_PROT_TRAILER_MAGIC: u16 = 0x6908;

/// Image header flags
pub const IMAGE_F_PIC: u32 = 0x0000_0001;
pub const IMAGE_F_NON_BOOTABLE: u32 = 0x0000_0002;
pub const IMAGE_F_ENCRYPTED: u32 = 0x0000_0004;

/// TLV type codes
pub const IMAGE_TLV_KEYHASH: u8 = 0x01;
pub const IMAGE_TLV_SHA256: u8 = 0x10;
pub const IMAGE_TLV_RSA2048: u8 = 0x20;
pub const IMAGE_TLV_ECDSA224: u8 = 0x21;
pub const IMAGE_TLV_ECDSA256: u8 = 0x22;
pub const IMAGE_TLV_RSA3072: u8 = 0x23;
pub const IMAGE_TLV_ED25519: u8 = 0x24;
pub const IMAGE_TLV_ENC_RSA: u8 = 0x30;
pub const IMAGE_TLV_ENC_KEK: u8 = 0x31;
pub const IMAGE_TLV_ENC_EC256: u8 = 0x32;
pub const IMAGE_TLV_AES_NONCE_LEGACY: u8 = 0x35;
pub const IMAGE_TLV_SECRET_ID_LEGACY: u8 = 0x36;
pub const IMAGE_TLV_AES_NONCE: u8 = 0xa1;
pub const IMAGE_TLV_SECRET_ID: u8 = 0xa2;
pub const IMAGE_TLV_SECTION: u8 = 0xa3;

pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;
pub const IMAGE_KEY_HASH_BYTE_SIZE: usize = 4;
pub const IMAGE_NONCE_BYTE_SIZE: usize = 8;
pub const IMAGE_SECRET_BYTE_SIZE: usize = 16;

/// Wrapped secret sizes, one per key-encryption scheme
pub const IMAGE_ENC_RSA_BYTE_SIZE: usize = 256;
pub const IMAGE_ENC_EC256_BYTE_SIZE: usize = 113;
pub const IMAGE_ENC_KEK_BYTE_SIZE: usize = 24;

pub type ImageDigest = [u8; SHA256_DIGEST_BYTE_SIZE];

/// Image Version
#[repr(C)]
#[derive(
    IntoBytes,
    FromBytes,
    Immutable,
    KnownLayout,
    Unaligned,
    Default,
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
)]
pub struct ImageVersion {
    pub major: u8,

    pub minor: u8,

    revision: U16,

    build_num: U32,
}

impl ImageVersion {
    pub fn new(major: u8, minor: u8, revision: u16, build_num: u32) -> Self {
        Self {
            major,
            minor,
            revision: U16::new(revision),
            build_num: U32::new(build_num),
        }
    }

    pub fn revision(&self) -> u16 {
        self.revision.get()
    }

    pub fn build_num(&self) -> u32 {
        self.build_num.get()
    }
}

impl fmt::Display for ImageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major,
            self.minor,
            self.revision(),
            self.build_num()
        )
    }
}

/// Error returned when a version string is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid image version \"{}\"", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for ImageVersion {
    type Err = ParseVersionError;

    /// Parses `major[.minor[.revision[.build]]]`; missing components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());

        let parts: Vec<&str> = s.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(err());
        }

        let mut nums = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part.parse::<u64>().map_err(|_| err())?;
        }

        Ok(Self::new(
            u8::try_from(nums[0]).map_err(|_| err())?,
            u8::try_from(nums[1]).map_err(|_| err())?,
            u16::try_from(nums[2]).map_err(|_| err())?,
            u32::try_from(nums[3]).map_err(|_| err())?,
        ))
    }
}

/// Getter and setter pairs for the little-endian header fields
macro_rules! header_fields {
    ($($field:ident, $setter:ident: $ty:ty;)*) => {
        $(
            pub fn $field(&self) -> $ty {
                self.$field.get()
            }

            pub fn $setter(&mut self, $field: $ty) {
                self.$field.set($field)
            }
        )*
    };
}

/// Image Header
#[repr(C)]
#[derive(
    IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned, Default, Debug, Copy, Clone, Eq, PartialEq,
)]
pub struct ImageHeader {
    magic: U32,

    pad1: U32,

    hdr_sz: U16,

    prot_sz: U16,

    img_sz: U32,

    flags: U32,

    version: ImageVersion,

    pad3: U32,
}

impl ImageHeader {
    /// Create a header with only the magic populated
    pub fn new() -> Self {
        Self {
            magic: U32::new(IMAGE_MAGIC),
            hdr_sz: U16::new(IMAGE_HEADER_SIZE as u16),
            ..Default::default()
        }
    }

    pub fn magic(&self) -> u32 {
        self.magic.get()
    }

    header_fields! {
        hdr_sz, set_hdr_sz: u16;
        prot_sz, set_prot_sz: u16;
        img_sz, set_img_sz: u32;
        flags, set_flags: u32;
    }

    pub fn version(&self) -> &ImageVersion {
        &self.version
    }

    pub fn set_version(&mut self, version: ImageVersion) {
        self.version = version
    }
}

/// TLV record header
#[repr(C)]
#[derive(
    IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned, Default, Debug, Copy, Clone, Eq, PartialEq,
)]
pub struct ImageTlvHeader {
    pub r#type: u8,

    pub pad: u8,

    len: U16,
}

impl ImageTlvHeader {
    pub fn new(r#type: u8, len: u16) -> Self {
        Self {
            r#type,
            pad: 0,
            len: U16::new(len),
        }
    }

    pub fn len(&self) -> u16 {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// TLV record
#[derive(Default, Debug, Clone, Eq, PartialEq, Getters)]
pub struct ImageTlv {
    #[getset(get = "pub")]
    header: ImageTlvHeader,

    #[getset(get = "pub")]
    data: Vec<u8>,
}

impl ImageTlv {
    /// Create a TLV; the length field always mirrors `data`.
    ///
    /// Callers are expected to have checked that `data` fits a `u16`.
    pub fn new(r#type: u8, data: Vec<u8>) -> Self {
        debug_assert!(data.len() <= u16::MAX as usize);
        Self {
            header: ImageTlvHeader::new(r#type, data.len() as u16),
            data,
        }
    }

    pub fn r#type(&self) -> u8 {
        self.header.r#type
    }

    /// On-wire size of the record
    pub fn size(&self) -> usize {
        IMAGE_TLV_SIZE + self.data.len()
    }
}

/// Marker preceding a TLV list
#[repr(C)]
#[derive(
    IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned, Default, Debug, Copy, Clone, Eq, PartialEq,
)]
pub struct ImageTrailer {
    magic: U16,

    tlv_tot_len: U16,
}

impl ImageTrailer {
    pub fn new(magic: u16, tlv_tot_len: u16) -> Self {
        Self {
            magic: U16::new(magic),
            tlv_tot_len: U16::new(tlv_tot_len),
        }
    }

    pub fn magic(&self) -> u16 {
        self.magic.get()
    }

    pub fn tlv_tot_len(&self) -> u16 {
        self.tlv_tot_len.get()
    }
}

/// Descriptive sub-region of the image body
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct ImageSection {
    pub name: String,

    pub offset: u32,

    pub size: u32,
}

impl FromStr for ImageSection {
    type Err = String;

    /// Parses `name:offset:size`; numbers are decimal or `0x` prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn parse_num(s: &str) -> Result<u32, String> {
            let res = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => s.parse::<u32>(),
            };
            res.map_err(|_| format!("invalid section number \"{s}\""))
        }

        let mut parts = s.rsplitn(3, ':');
        let (Some(size), Some(offset), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("section \"{s}\" is not of the form name:offset:size"));
        };
        if name.is_empty() {
            return Err(format!("section \"{s}\" has an empty name"));
        }

        Ok(Self {
            name: name.to_string(),
            offset: parse_num(offset)?,
            size: parse_num(size)?,
        })
    }
}

/// Firmware image
#[derive(Default, Debug, Clone, Eq, PartialEq, Getters, CopyGetters)]
pub struct Image {
    /// Header
    #[getset(get_copy = "pub")]
    header: ImageHeader,

    /// Zero padding between the header and the body
    #[getset(get = "pub")]
    pad: Vec<u8>,

    /// Body, plaintext or ciphertext
    #[getset(get = "pub")]
    body: Vec<u8>,

    /// Protected TLVs
    #[getset(get = "pub")]
    prot_tlvs: Vec<ImageTlv>,

    /// Trailing TLVs
    #[getset(get = "pub")]
    tlvs: Vec<ImageTlv>,
}

impl Image {
    pub fn new(
        header: ImageHeader,
        pad: Vec<u8>,
        body: Vec<u8>,
        prot_tlvs: Vec<ImageTlv>,
        tlvs: Vec<ImageTlv>,
    ) -> Self {
        Self {
            header,
            pad,
            body,
            prot_tlvs,
            tlvs,
        }
    }

    /// Protected trailer; only present when protected TLVs exist
    pub fn prot_trailer(&self) -> Option<ImageTrailer> {
        if self.prot_tlvs.is_empty() {
            None
        } else {
            Some(ImageTrailer::new(
                IMAGE_PROT_TRAILER_MAGIC,
                self.header.prot_sz(),
            ))
        }
    }

    /// Trailer preceding the trailing TLVs
    ///
    /// Callers of [`Image::new`] are expected to have checked that the
    /// trailing TLVs fit the `u16` length field.
    pub fn trailer(&self) -> ImageTrailer {
        let len = IMAGE_TRAILER_SIZE + self.tlvs.iter().map(ImageTlv::size).sum::<usize>();
        debug_assert!(len <= u16::MAX as usize);
        ImageTrailer::new(IMAGE_TRAILER_MAGIC, len as u16)
    }

    /// Payload of the image digest TLV
    pub fn hash(&self) -> Option<&[u8]> {
        self.tlvs
            .iter()
            .find(|tlv| tlv.r#type() == IMAGE_TLV_SHA256)
            .map(|tlv| tlv.data().as_slice())
    }

    /// Total serialized size in bytes
    pub fn total_size(&self) -> usize {
        IMAGE_HEADER_SIZE
            + self.pad.len()
            + self.body.len()
            + self.header.prot_sz() as usize
            + self.trailer().tlv_tot_len() as usize
    }
}
