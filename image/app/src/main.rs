/*++

Licensed under the Apache-2.0 license.

File Name:

   main.rs

Abstract:

    Main entry point of the firmware imaging application

--*/
use std::path::PathBuf;

use clap::{arg, value_parser, ArgAction, Command};
use fwimage_types::{ImageSection, ImageVersion};
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod create;

fn cli() -> Command {
    let sub_cmds = vec![Command::new("create")
        .about("Create a new signed firmware image")
        .arg(
            arg!(--"bin" <FILE> "Raw firmware binary")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"version" <VERSION> "Image version [major.minor.revision.build]")
                .required(true)
                .value_parser(value_parser!(ImageVersion)),
        )
        .arg(
            arg!(--"key-config" <FILE> "Key Configuration file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"out" <FILE> "Output file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"enc-key" <FILE> "Encryption key: public key or base64 KEK, or the base64 secret with --hw-key-index")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"hw-key-index" <U32> "Index of the hardware key that decrypts the image")
                .required(false)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(--"loader-hash" <SHA256HASH> "Digest of the loader; marks the image non-bootable")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            arg!(--"header-size" <BYTES> "Header size including padding, 0 for the default")
                .required(false)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"pad" <BYTES> "Pad the body with 0xff to a multiple of this size, 0 for none")
                .required(false)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"section" <SECTION> "Body section [name:offset:size]; may be repeated")
                .required(false)
                .action(ArgAction::Append)
                .value_parser(value_parser!(ImageSection)),
        )
        .arg(
            arg!(--"legacy-tlv" "Use the legacy key index and nonce TLV types")
                .action(ArgAction::SetTrue),
        )];

    Command::new("fwimage")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommands(sub_cmds)
        .arg(arg!(-v --verbose "Enable debug logging").global(true))
        .about("Firmware imaging tools")
}

/// Entry point
fn main() {
    let cmd = cli().get_matches();

    let level = if cmd.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let result = match cmd.subcommand() {
        Some(("create", args)) => create::run_cmd(args),
        _ => unreachable!(),
    };

    if let Err(err) = result {
        log::error!("{err:#}");
        std::process::exit(-1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_create_args() {
        let matches = cli()
            .try_get_matches_from([
                "fwimage",
                "create",
                "--bin",
                "app.bin",
                "--version",
                "1.2.3",
                "--key-config",
                "keys.toml",
                "--out",
                "app.img",
                "--section",
                "boot:0:0x100",
                "--section",
                "app:0x100:0x200",
                "--legacy-tlv",
                "-v",
            ])
            .unwrap();
        assert!(matches.get_flag("verbose"));

        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "create");
        assert_eq!(
            args.get_one::<ImageVersion>("version"),
            Some(&ImageVersion::new(1, 2, 3, 0))
        );
        let sections: Vec<&ImageSection> = args.get_many("section").unwrap().collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].offset, 0x100);
        assert!(args.get_flag("legacy-tlv"));
        assert!(args.get_one::<u32>("hw-key-index").is_none());
    }

    #[test]
    fn test_bad_version_rejected() {
        assert!(cli()
            .try_get_matches_from([
                "fwimage",
                "create",
                "--bin",
                "a",
                "--version",
                "1.2.3.4.5",
                "--key-config",
                "k",
                "--out",
                "o",
            ])
            .is_err());
    }
}
