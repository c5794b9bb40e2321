// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, Context as _};
use provision_sys::{
    count_authorized_keys, create_dir_if_not_exists, set_owner_mode, validate_public_key,
    PasswdEntry, SysError,
};
use std::{
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// The credential file name inside `~/.ssh`.
pub const AUTHORIZED_KEYS: &str = "authorized_keys";

/// Resolve the public key input, if any.
///
/// The key may be given inline or as a file path, but not both.
/// File errors and format violations are fatal; they carry the
/// category the operator needs (NotFound, PermissionDenied,
/// InvalidArgument).
pub fn resolve_key_input(
    key: Option<&str>,
    key_file: Option<&Path>,
) -> ah::Result<Option<String>> {
    let content = match (key, key_file) {
        (Some(_), Some(_)) => {
            return Err(SysError::invalid_argument(
                "--key and --key-file are mutually exclusive.",
            )
            .into());
        }
        (Some(key), None) => key.to_string(),
        (None, Some(path)) => read_key_file(path)?,
        (None, None) => return Ok(None),
    };
    let content = content.trim().to_string();
    validate_public_key(&content)?;
    Ok(Some(content))
}

fn read_key_file(path: &Path) -> ah::Result<String> {
    match read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(SysError::not_found(format!("Key file {path:?} does not exist.")).into())
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(SysError::permission_denied(format!("Key file {path:?} is not readable.")).into())
        }
        Err(e) => Err(e).context("Read key file"),
    }
}

/// Create the account's `~/.ssh` directory (0700, account-owned).
///
/// Idempotent: an already present directory is re-permissioned,
/// not an error.
pub fn setup_ssh_dir(
    home: &Path,
    entry: Option<&PasswdEntry>,
    dry_run: bool,
) -> ah::Result<PathBuf> {
    let ssh_dir = home.join(".ssh");
    if dry_run {
        println!("Would create {ssh_dir:?} (mode 0700, account-owned).");
        return Ok(ssh_dir);
    }
    let entry = entry.context("Missing passwd entry for ssh dir setup")?;
    create_dir_if_not_exists(&ssh_dir).context("Create .ssh directory")?;
    set_owner_mode(&ssh_dir, entry.uid, entry.gid, 0o700)
        .context("Set .ssh directory owner and mode")?;
    Ok(ssh_dir)
}

/// Install the public key as the sole content of authorized_keys.
pub fn install_key(
    ssh_dir: &Path,
    public_key: &str,
    entry: Option<&PasswdEntry>,
    dry_run: bool,
) -> ah::Result<PathBuf> {
    let path = ssh_dir.join(AUTHORIZED_KEYS);
    if dry_run {
        println!("Would write the public key to {path:?} (mode 0600, account-owned).");
        return Ok(path);
    }
    let entry = entry.context("Missing passwd entry for key installation")?;
    write(&path, format!("{public_key}\n")).context("Write authorized_keys")?;
    set_owner_mode(&path, entry.uid, entry.gid, 0o600)
        .context("Set authorized_keys owner and mode")?;
    println!("Public key installed to {path:?}.");
    Ok(path)
}

/// Report the number of recognized keys in authorized_keys.
///
/// Runs whether or not a key was supplied this run, so re-runs
/// against an already provisioned account still report.
/// Observational only. Never fails the run.
pub fn report_key_count(path: &Path) -> Option<usize> {
    let content = match read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            eprintln!("Warning: Could not read {path:?}: {e}");
            return None;
        }
    };
    let count = count_authorized_keys(&content);
    println!("{count} authorized key(s) present in {path:?}.");
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_sys::{SysError, SysErrorKind};
    use std::fs::write;
    use tempfile::tempdir;

    const ED25519_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAbc test@example.com";

    fn kind_of<T: std::fmt::Debug>(result: ah::Result<T>) -> SysErrorKind {
        result
            .unwrap_err()
            .downcast_ref::<SysError>()
            .unwrap()
            .kind()
    }

    #[test]
    fn test_no_key_input() {
        assert_eq!(resolve_key_input(None, None).unwrap(), None);
    }

    #[test]
    fn test_inline_key() {
        let key = resolve_key_input(Some(ED25519_KEY), None).unwrap();
        assert_eq!(key.as_deref(), Some(ED25519_KEY));
    }

    #[test]
    fn test_key_from_file_is_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("key.pub");
        write(&path, format!("{ED25519_KEY}\n")).unwrap();

        let key = resolve_key_input(None, Some(&path)).unwrap();
        assert_eq!(key.as_deref(), Some(ED25519_KEY));
    }

    #[test]
    fn test_both_inputs_rejected() {
        let kind = kind_of(resolve_key_input(Some(ED25519_KEY), Some(Path::new("/x"))));
        assert_eq!(kind, SysErrorKind::InvalidArgument);
    }

    #[test]
    fn test_missing_key_file() {
        let kind = kind_of(resolve_key_input(None, Some(Path::new("/no/such/key.pub"))));
        assert_eq!(kind, SysErrorKind::NotFound);
    }

    #[test]
    fn test_malformed_key_rejected() {
        let kind = kind_of(resolve_key_input(Some("not-a-key"), None));
        assert_eq!(kind, SysErrorKind::InvalidArgument);

        let dir = tempdir().unwrap();
        let path = dir.path().join("key.pub");
        write(&path, "garbage\n").unwrap();
        let kind = kind_of(resolve_key_input(None, Some(&path)));
        assert_eq!(kind, SysErrorKind::InvalidArgument);
    }

    #[test]
    fn test_dry_run_mutates_nothing() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");

        let ssh_dir = setup_ssh_dir(&home, None, true).unwrap();
        let path = install_key(&ssh_dir, ED25519_KEY, None, true).unwrap();

        assert!(!home.exists());
        assert!(!ssh_dir.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_report_on_missing_file_is_silent() {
        let dir = tempdir().unwrap();
        assert_eq!(report_key_count(&dir.path().join(AUTHORIZED_KEYS)), None);
    }

    #[test]
    fn test_install_key_single_line() {
        let dir = tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        use std::os::unix::fs::MetadataExt as _;
        let entry = PasswdEntry {
            name: "admin".to_string(),
            uid: meta.uid(),
            gid: meta.gid(),
            home: dir.path().to_path_buf(),
        };

        let ssh_dir = setup_ssh_dir(&entry.home, Some(&entry), false).unwrap();
        let path = install_key(&ssh_dir, ED25519_KEY, Some(&entry), false).unwrap();
        // Re-running converges to the same single-line file.
        install_key(&ssh_dir, ED25519_KEY, Some(&entry), false).unwrap();

        let content = read_to_string(&path).unwrap();
        assert_eq!(content, format!("{ED25519_KEY}\n"));
        assert_eq!(count_authorized_keys(&content), 1);
        // The report finds the file without a key being supplied
        // this run.
        assert_eq!(report_key_count(&path), Some(1));

        let mode = std::fs::metadata(&path).unwrap().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let mode = std::fs::metadata(&ssh_dir).unwrap().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }
}

// vim: ts=4 sw=4 expandtab
