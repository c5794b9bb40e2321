// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![forbid(unsafe_code)]

mod agent;
mod keygen;

use crate::{
    agent::{add_key, ensure_agent},
    keygen::{generate, resolve_key_paths, validate_base_name, KeyType},
};
use anyhow::{self as ah, format_err as err, Context as _};
use clap::Parser;
use provision_sys::{create_dir_if_not_exists, SysError};
use std::{
    fs::{metadata, set_permissions},
    os::unix::fs::PermissionsExt as _,
    path::PathBuf,
};

#[derive(Parser, Debug)]
struct Opts {
    /// Email address embedded as the key comment. Required.
    ///
    /// Not enforced by the parser, so that --version works alone;
    /// a missing email is rejected before anything else happens.
    #[arg(short, long)]
    email: Option<String>,

    /// Base file name for the key pair.
    ///
    /// If not given, the conventional name for the key type is used
    /// (e.g. id_ed25519). If a key of that name already exists,
    /// a numeric suffix is appended. Existing keys are never
    /// overwritten.
    #[arg(short, long)]
    name: Option<String>,

    /// Key type to generate.
    ///
    /// One of: ed25519, rsa, ecdsa.
    #[arg(short = 't', long = "type", default_value = "ed25519")]
    key_type: KeyType,

    /// Register the new key with a running ssh-agent.
    ///
    /// An agent is started if none is reachable. A failure in this
    /// step is reported, but does not invalidate the generated key.
    #[arg(short, long)]
    agent: bool,

    /// Show version information and exit.
    #[arg(long, short = 'v')]
    version: bool,
}

/// Resolve and prepare the `~/.ssh` output directory.
fn ssh_dir() -> ah::Result<PathBuf> {
    let Some(home) = home::home_dir() else {
        return Err(err!("Could not determine the home directory."));
    };
    let dir = home.join(".ssh");
    let fresh = !dir.exists();
    create_dir_if_not_exists(&dir).context("Create ~/.ssh")?;
    if fresh {
        let mut perm = metadata(&dir)?.permissions();
        perm.set_mode(0o700);
        set_permissions(&dir, perm).context("Set ~/.ssh mode")?;
    }
    Ok(dir)
}

fn run(opts: &Opts) -> ah::Result<()> {
    let Some(email) = opts.email.as_deref() else {
        return Err(SysError::invalid_argument("--email is required.").into());
    };
    if !email.contains('@') {
        return Err(
            SysError::invalid_argument(format!("'{email}' is not an email address.")).into(),
        );
    }
    if let Some(name) = &opts.name {
        validate_base_name(name)?;
    }

    let dir = ssh_dir()?;
    let base = opts
        .name
        .as_deref()
        .unwrap_or_else(|| opts.key_type.default_stem());
    let paths = resolve_key_paths(&dir, base);

    println!("Generating {} key pair: {:?}", opts.key_type, paths.private);
    let key = generate(opts.key_type, email, &paths)?;

    if opts.agent {
        // The key pair already exists on disk.
        // Failing to register it only warrants a warning.
        match ensure_agent().and_then(|agent| add_key(&agent, &key.paths.private)) {
            Ok(()) => println!("Key registered with ssh-agent."),
            Err(e) => eprintln!("Warning: Could not register key with ssh-agent: {e:#}"),
        }
    }

    println!();
    println!("Public key (copy this to the remote side):");
    println!("{}", key.public_key);
    if let Some(fingerprint) = &key.fingerprint {
        println!();
        println!("Fingerprint: {fingerprint}");
    }
    println!();
    println!("Next steps:");
    if !opts.agent {
        println!("  Register with an agent:  ssh-add {:?}", key.paths.private);
    }
    println!(
        "  Test the connection:     ssh -i {:?} user@host",
        key.paths.private
    );
    Ok(())
}

/// Parse the command line.
///
/// Exits 0 for --help, but 1 for usage errors,
/// instead of clap's default usage-error code 2.
fn parse_opts() -> Opts {
    use clap::error::ErrorKind;

    match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let exit_code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(exit_code);
        }
    }
}

fn main() -> ah::Result<()> {
    let opts = parse_opts();

    if opts.version {
        println!("provision-key version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    run(&opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_sys::{SysError, SysErrorKind};

    #[test]
    fn test_version_flag_parses_without_email() {
        assert!(Opts::try_parse_from(["provision-key", "--version"]).is_ok());
        assert!(Opts::try_parse_from(["provision-key", "-v"]).is_ok());
    }

    #[test]
    fn test_missing_email_is_invalid_argument() {
        let opts = Opts::try_parse_from(["provision-key"]).unwrap();
        let err = run(&opts).unwrap_err();
        let sys = err.downcast_ref::<SysError>().unwrap();
        assert_eq!(sys.kind(), SysErrorKind::InvalidArgument);
    }

    #[test]
    fn test_malformed_email_is_invalid_argument() {
        let opts = Opts::try_parse_from(["provision-key", "-e", "nobody"]).unwrap();
        let err = run(&opts).unwrap_err();
        let sys = err.downcast_ref::<SysError>().unwrap();
        assert_eq!(sys.kind(), SysErrorKind::InvalidArgument);
    }
}

// vim: ts=4 sw=4 expandtab
