/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Firmware image serialization routines.

--*/
use fwimage_types::*;
use std::io::Write;
use zerocopy::IntoBytes;

/// Image Writer
pub struct ImageWriter<W: Write> {
    writer: W,
}

impl<W: Write> ImageWriter<W> {
    /// Create an instance of `ImageWriter`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write Image
    pub fn write(&mut self, image: &Image) -> anyhow::Result<()> {
        self.writer.write_all(image.header().as_bytes())?;
        self.writer.write_all(image.pad())?;
        self.writer.write_all(image.body())?;

        if let Some(prot_trailer) = image.prot_trailer() {
            self.writer.write_all(prot_trailer.as_bytes())?;
            self.write_tlvs(image.prot_tlvs())?;
        }

        self.writer.write_all(image.trailer().as_bytes())?;
        self.write_tlvs(image.tlvs())?;

        self.writer.flush()?;
        Ok(())
    }

    fn write_tlvs(&mut self, tlvs: &[ImageTlv]) -> anyhow::Result<()> {
        for tlv in tlvs {
            self.writer.write_all(tlv.header().as_bytes())?;
            self.writer.write_all(tlv.data())?;
        }
        Ok(())
    }
}
