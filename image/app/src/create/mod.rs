/*++

Licensed under the Apache-2.0 license.

File Name:

   mod.rs

Abstract:

    File contains implementation of the image creation command.

--*/

mod config;

use anyhow::{bail, Context};
use clap::ArgMatches;
use fwimage_crypto::{enc_key_from_file, signing_key_from_file, RustCrypto};
use fwimage_gen::*;
use fwimage_serde::ImageWriter;
use fwimage_types::*;
use std::path::{Path, PathBuf};

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let out_path: &PathBuf = args
        .get_one::<PathBuf>("out")
        .with_context(|| "out arg not specified")?;

    let gen_config = gen_config(args)?;

    let gen = ImageGenerator::new(RustCrypto::default());
    let image = gen.generate(&gen_config)?;

    let out_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(out_path)
        .with_context(|| format!("Failed to create file {}", out_path.display()))?;

    let mut writer = ImageWriter::new(out_file);
    writer
        .write(&image)
        .with_context(|| format!("Failed to write image {}", out_path.display()))?;

    log::info!("Wrote {} bytes to {}", image.total_size(), out_path.display());

    Ok(())
}

/// Build the generator configuration from the command line
fn gen_config(args: &ArgMatches) -> anyhow::Result<ImageGeneratorConfig> {
    let bin_path: &PathBuf = args
        .get_one::<PathBuf>("bin")
        .with_context(|| "bin arg not specified")?;

    let version: &ImageVersion = args
        .get_one::<ImageVersion>("version")
        .with_context(|| "version arg not specified")?;

    let config_path: &PathBuf = args
        .get_one::<PathBuf>("key-config")
        .with_context(|| "key-config arg not specified")?;

    let config = config::load_key_config(config_path)?;

    let config_dir = config_path
        .parent()
        .with_context(|| "Invalid parent path")?;

    let sig_keys = config
        .sign_key_paths(config_dir)
        .iter()
        .map(|path| signing_key_from_file(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let body = std::fs::read(bin_path)
        .with_context(|| format!("Failed to read firmware binary {}", bin_path.display()))?;

    let initial_hash = args
        .get_one::<String>("loader-hash")
        .map(|hash| loader_hash(hash))
        .transpose()?;

    let encryption = encryption(
        args.get_one::<PathBuf>("enc-key").map(PathBuf::as_path),
        args.get_one::<u32>("hw-key-index").copied(),
    )?;

    Ok(ImageGeneratorConfig {
        body,
        version: *version,
        sig_keys,
        sections: args
            .get_many::<ImageSection>("section")
            .map(|sections| sections.cloned().collect())
            .unwrap_or_default(),
        initial_hash,
        header_size: nonzero(args, "header-size"),
        image_pad: nonzero(args, "pad"),
        use_legacy_tlv: args.get_flag("legacy-tlv"),
        encryption,
    })
}

/// Zero means "not requested" for the size options
fn nonzero(args: &ArgMatches, id: &str) -> Option<usize> {
    args.get_one::<usize>(id).copied().filter(|value| *value != 0)
}

fn loader_hash(hash: &str) -> anyhow::Result<Vec<u8>> {
    let hash = hex::decode(hash).with_context(|| "loader-hash is not valid hex")?;
    if hash.len() != SHA256_DIGEST_BYTE_SIZE {
        bail!(
            "loader-hash must be {SHA256_DIGEST_BYTE_SIZE} bytes, got {}",
            hash.len()
        );
    }
    Ok(hash)
}

/// With a hardware key index the key file holds the base64 image secret;
/// otherwise it is the key the secret is wrapped under.
fn encryption(
    enc_key: Option<&Path>,
    hw_key_index: Option<u32>,
) -> anyhow::Result<Option<ImageEncryption>> {
    let encryption = match (enc_key, hw_key_index) {
        (None, None) => None,

        (Some(path), None) => Some(ImageEncryption::Wrapped(enc_key_from_file(path)?)),

        (path, Some(index)) => {
            let secret = path
                .map(|path| {
                    std::fs::read_to_string(path).with_context(|| {
                        format!("Failed to read image secret {}", path.display())
                    })
                })
                .transpose()?;
            Some(ImageEncryption::HwKeyIndex { index, secret })
        }
    };
    Ok(encryption)
}
