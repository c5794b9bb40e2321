// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, Context as _};
use provision_sys::{SysError, SystemTool};
use std::{
    ffi::OsStr,
    fs::{metadata, read_to_string, set_permissions},
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
};

/// The key generation tool.
const SSH_KEYGEN: &str = "ssh-keygen";

/// Supported key types.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum KeyType {
    /// Ed25519 (default, recommended).
    #[default]
    Ed25519,

    /// RSA, for compatibility with older systems.
    Rsa,

    /// ECDSA on NIST curves.
    Ecdsa,
}

impl KeyType {
    /// The type name passed to ssh-keygen's `-t` option.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Rsa => "rsa",
            Self::Ecdsa => "ecdsa",
        }
    }

    /// The conventional private key file name for this type.
    pub fn default_stem(&self) -> &'static str {
        match self {
            Self::Ed25519 => "id_ed25519",
            Self::Rsa => "id_rsa",
            Self::Ecdsa => "id_ecdsa",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.tool_name())
    }
}

impl std::str::FromStr for KeyType {
    type Err = ah::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "ed25519" => Ok(Self::Ed25519),
            "rsa" => Ok(Self::Rsa),
            "ecdsa" => Ok(Self::Ecdsa),
            other => Err(SysError::invalid_argument(format!(
                "Key type '{other}' is not valid. Valid values are: ed25519, rsa, ecdsa."
            ))
            .into()),
        }
    }
}

/// Validate a custom base file name.
///
/// The name becomes a single path component under `~/.ssh`;
/// separators and the dot directories must not sneak the key
/// out of (or onto) that directory.
pub fn validate_base_name(name: &str) -> ah::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(
            SysError::invalid_argument(format!("'{name}' is not a valid key file name.")).into(),
        );
    }
    Ok(())
}

/// The two halves of a key pair on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPairPaths {
    pub private: PathBuf,
    pub public: PathBuf,
}

impl KeyPairPaths {
    fn new(dir: &Path, stem: &str) -> Self {
        Self {
            private: dir.join(stem),
            public: dir.join(format!("{stem}.pub")),
        }
    }

    /// Check if either half already exists on disk.
    fn occupied(&self) -> bool {
        self.private.exists() || self.public.exists()
    }
}

/// Choose a key pair path under `dir` that collides with nothing.
///
/// If `<base>` or `<base>.pub` already exists, the lowest-numbered
/// free suffix `<base>_1`, `<base>_2`, ... is chosen instead.
/// Existing keys are never overwritten, regardless of how many
/// prior collisions have accumulated.
pub fn resolve_key_paths(dir: &Path, base: &str) -> KeyPairPaths {
    let mut paths = KeyPairPaths::new(dir, base);
    let mut n = 0_u64;
    while paths.occupied() {
        n += 1;
        paths = KeyPairPaths::new(dir, &format!("{base}_{n}"));
    }
    paths
}

/// A freshly generated key pair.
#[derive(Clone, Debug)]
pub struct GeneratedKey {
    pub paths: KeyPairPaths,
    /// The public key line, whitespace-trimmed.
    pub public_key: String,
    /// Fingerprint, if ssh-keygen could report one.
    pub fingerprint: Option<String>,
}

/// Generate a new key pair without a passphrase.
pub fn generate(key_type: KeyType, comment: &str, paths: &KeyPairPaths) -> ah::Result<GeneratedKey> {
    generate_with_tool(OsStr::new(SSH_KEYGEN), key_type, comment, paths)
}

fn generate_with_tool(
    tool: &OsStr,
    key_type: KeyType,
    comment: &str,
    paths: &KeyPairPaths,
) -> ah::Result<GeneratedKey> {
    SystemTool::new(tool)
        .args(["-t", key_type.tool_name()])
        .args(["-P", ""])
        .arg("-f")
        .arg(&paths.private)
        .args(["-C", comment])
        .arg("-q")
        .run()
        .context("Generate key pair")?;

    // Private half: owner read/write. Public half: world-readable.
    set_mode(&paths.private, 0o600)?;
    set_mode(&paths.public, 0o644)?;

    let public_key = read_to_string(&paths.public)
        .context("Read generated public key")?
        .trim()
        .to_string();

    // Informational only. A failure here does not invalidate
    // the already generated key pair.
    let fingerprint = match SystemTool::new(tool).arg("-l").arg("-f").arg(&paths.private).run() {
        Ok(out) => Some(out.trim().to_string()),
        Err(e) => {
            eprintln!("Warning: Could not read key fingerprint: {e}");
            None
        }
    };

    Ok(GeneratedKey {
        paths: paths.clone(),
        public_key,
        fingerprint,
    })
}

fn set_mode(path: &Path, mode: u32) -> ah::Result<()> {
    let mut perm = metadata(path).context("Stat key file")?.permissions();
    perm.set_mode(mode);
    set_permissions(path, perm).context("Set key file mode")?;
    Ok(())
}


// vim: ts=4 sw=4 expandtab
