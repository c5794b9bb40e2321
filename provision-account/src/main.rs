// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![forbid(unsafe_code)]

mod account;
mod authkeys;

use crate::{
    account::{validate_username, AccountProvisioner},
    authkeys::{install_key, report_key_count, resolve_key_input, setup_ssh_dir, AUTHORIZED_KEYS},
};
use anyhow as ah;
use clap::Parser;
use nix::unistd::Uid;
use provision_sys::SysError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Opts {
    /// Name of the account to provision.
    #[arg(long, default_value = "admin")]
    user: String,

    /// Public key line to authorize for the account.
    ///
    /// Mutually exclusive with --key-file.
    #[arg(long)]
    key: Option<String>,

    /// Path to a file containing the public key to authorize.
    ///
    /// Mutually exclusive with --key.
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Interactively assign a password to the account.
    ///
    /// This prompts on the terminal. Skipped under --dry-run.
    #[arg(long)]
    password: bool,

    /// Describe every action instead of performing it.
    ///
    /// Validation (username, key format, key file reads) still runs
    /// with real failure semantics. Nothing is mutated.
    #[arg(long)]
    dry_run: bool,

    /// Show version information and exit.
    #[arg(long, short = 'v')]
    version: bool,
}

fn run(opts: &Opts) -> ah::Result<()> {
    // All validation gates run before the first side effect.
    validate_username(&opts.user)?;
    let key = resolve_key_input(opts.key.as_deref(), opts.key_file.as_deref())?;

    if !Uid::effective().is_root() {
        if opts.dry_run {
            println!("Note: not running as root. A real run requires root.");
        } else {
            return Err(
                SysError::permission_denied("provision-account must be run as root.").into(),
            );
        }
    }

    let prov = AccountProvisioner::new(&opts.user, opts.dry_run);
    let entry = prov.ensure_account()?;
    prov.grant_admin_group()?;

    let home = prov.home_dir(entry.as_ref());
    let ssh_dir = setup_ssh_dir(&home, entry.as_ref(), opts.dry_run)?;
    let authorized_keys = ssh_dir.join(AUTHORIZED_KEYS);
    match &key {
        Some(key) => {
            install_key(&ssh_dir, key, entry.as_ref(), opts.dry_run)?;
        }
        None => {
            eprintln!("Warning: No public key supplied. Password login only, for now.");
            eprintln!("To authorize a key later, append it to {authorized_keys:?} (mode 0600).");
        }
    }

    if opts.password {
        prov.set_password()?;
    }

    // Observational, whether or not a key was supplied this run.
    if opts.dry_run {
        println!("Would verify the key count in {authorized_keys:?}.");
    } else {
        report_key_count(&authorized_keys);
    }

    println!();
    if opts.dry_run {
        println!("Dry-run complete. No changes were made.");
    } else {
        println!("Account '{}' is provisioned:", opts.user);
        println!("  home:       {home:?}");
        println!("  ssh config: {ssh_dir:?}");
        println!(
            "  login:      ssh {}@<host>{}",
            opts.user,
            if key.is_some() { "" } else { " (password)" },
        );
    }
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
        println!("provision-account version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    run(&opts)
}

// vim: ts=4 sw=4 expandtab
