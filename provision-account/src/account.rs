// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, format_err as err, Context as _};
use provision_sys::{detect_admin_group, get_user, PasswdEntry, SysError, SystemTool};
use std::path::PathBuf;

/// Maximum username length accepted by useradd.
pub const MAX_USERNAME_LEN: usize = 32;

/// Default interactive shell for new accounts.
const DEFAULT_SHELL: &str = "/bin/bash";

/// Validate a username.
///
/// The accepted pattern is `^[a-z_][a-z0-9_-]*$` with a maximum
/// length of 32 characters. This runs before any side effect.
pub fn validate_username(name: &str) -> ah::Result<()> {
    let invalid = |reason: &str| {
        Err(SysError::invalid_argument(format!("Username '{name}' {reason}")).into())
    };

    if name.is_empty() {
        return invalid("is empty.");
    }
    if name.len() > MAX_USERNAME_LEN {
        return invalid("is longer than 32 characters.");
    }
    let first = name.as_bytes()[0];
    if !matches!(first, b'a'..=b'z' | b'_') {
        return invalid("must start with a lowercase letter or underscore.");
    }
    for c in name.bytes().skip(1) {
        if !matches!(c, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-') {
            return invalid(
                "may only contain lowercase letters, digits, underscores and hyphens.",
            );
        }
    }
    Ok(())
}

/// One account provisioning run.
///
/// Under dry-run every mutating step prints the action it would take
/// instead of performing it. Validation and branching are identical
/// to a real run.
pub struct AccountProvisioner {
    user: String,
    dry_run: bool,
}

impl AccountProvisioner {
    pub fn new(user: &str, dry_run: bool) -> Self {
        Self {
            user: user.to_string(),
            dry_run,
        }
    }

    /// Create the account, unless it already exists.
    ///
    /// An existing account is a soft condition: it is reported and
    /// creation is skipped, so that re-runs against a partially
    /// provisioned account converge instead of failing.
    ///
    /// Returns the passwd entry, or `None` for an account that
    /// would be created under dry-run.
    pub fn ensure_account(&self) -> ah::Result<Option<PasswdEntry>> {
        if let Some(entry) = get_user(&self.user)? {
            println!(
                "Account '{}' already exists (uid {}). Skipping creation.",
                self.user, entry.uid
            );
            return Ok(Some(entry));
        }

        let useradd = SystemTool::new("useradd")
            .arg("-m")
            .args(["-s", DEFAULT_SHELL])
            .arg(&self.user);
        if self.dry_run {
            println!("Would run: {}", useradd.describe());
            return Ok(None);
        }

        useradd.run().context("Create account")?;
        println!("Account '{}' created.", self.user);
        let Some(entry) = get_user(&self.user)? else {
            return Err(err!(
                "Account '{}' was created, but is missing from /etc/passwd.",
                self.user
            ));
        };
        Ok(Some(entry))
    }

    /// Grant membership in the host's administrative group.
    ///
    /// The group name is probed from /etc/group, not assumed.
    /// An unknown administrative group is a warning, not an error.
    pub fn grant_admin_group(&self) -> ah::Result<()> {
        let Some(group) = detect_admin_group()? else {
            eprintln!(
                "Warning: Could not detect the administrative group \
                 (tried: sudo, wheel). Grant admin privileges manually."
            );
            return Ok(());
        };

        let usermod = SystemTool::new("usermod")
            .args(["-aG", group])
            .arg(&self.user);
        if self.dry_run {
            println!("Would run: {}", usermod.describe());
            return Ok(());
        }

        usermod.run().context("Grant admin group membership")?;
        println!("Account '{}' added to group '{group}'.", self.user);
        Ok(())
    }

    /// The account's home directory.
    ///
    /// Read from the passwd entry where one exists. Under dry-run,
    /// for an account that does not exist yet, the conventional
    /// location is assumed.
    pub fn home_dir(&self, entry: Option<&PasswdEntry>) -> PathBuf {
        match entry {
            Some(entry) => entry.home.clone(),
            None => PathBuf::from(format!("/home/{}", self.user)),
        }
    }

    /// Interactively assign a password to the account.
    ///
    /// This blocks for operator input and is skipped under dry-run.
    pub fn set_password(&self) -> ah::Result<()> {
        let passwd = SystemTool::new("passwd").arg(&self.user);
        if self.dry_run {
            println!("Would prompt for a password: {}", passwd.describe());
            return Ok(());
        }
        println!("Setting password for '{}':", self.user);
        passwd.run_interactive().context("Set account password")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_sys::{SysError, SysErrorKind};

    fn kind_of(result: ah::Result<()>) -> SysErrorKind {
        result
            .unwrap_err()
            .downcast_ref::<SysError>()
            .unwrap()
            .kind()
    }

    #[test]
    fn test_valid_usernames() {
        validate_username("admin").unwrap();
        validate_username("_svc").unwrap();
        validate_username("web-deploy_2").unwrap();
        validate_username("a").unwrap();
        validate_username(&"a".repeat(32)).unwrap();
    }

    #[test]
    fn test_invalid_usernames() {
        assert_eq!(kind_of(validate_username("")), SysErrorKind::InvalidArgument);
        assert_eq!(
            kind_of(validate_username("9admin")),
            SysErrorKind::InvalidArgument
        );
        assert_eq!(
            kind_of(validate_username("Bad Name")),
            SysErrorKind::InvalidArgument
        );
        assert_eq!(
            kind_of(validate_username("Admin")),
            SysErrorKind::InvalidArgument
        );
        assert_eq!(
            kind_of(validate_username("-admin")),
            SysErrorKind::InvalidArgument
        );
        assert_eq!(
            kind_of(validate_username("admin!")),
            SysErrorKind::InvalidArgument
        );
        assert_eq!(
            kind_of(validate_username(&"a".repeat(33))),
            SysErrorKind::InvalidArgument
        );
        // Multi-byte input must not slip through the byte checks.
        assert_eq!(
            kind_of(validate_username("ädmin")),
            SysErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_dry_run_home_dir_fallback() {
        let prov = AccountProvisioner::new("deploy", true);
        assert_eq!(prov.home_dir(None), PathBuf::from("/home/deploy"));
    }
}

// vim: ts=4 sw=4 expandtab
