// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, Context as _};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

const ETC_PASSWD: &str = "/etc/passwd";
const ETC_GROUP: &str = "/etc/group";

/// Administrative group candidates, in probe order.
const ADMIN_GROUPS: &[&str] = &["sudo", "wheel"];

/// One `/etc/passwd` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Look up a user in a passwd database file.
fn passwd_lookup(path: &Path, user_name: &str) -> ah::Result<Option<PasswdEntry>> {
    let data = read_to_string(path).context("Read /etc/passwd database")?;

    for line in data.lines() {
        let mut fields = line.splitn(7, ':');

        let name = fields.next().context("Get passwd name")?;
        if name == user_name {
            let _pw = fields.next().context("Get passwd password")?;
            let uid = fields.next().context("Get passwd uid")?;
            let gid = fields.next().context("Get passwd gid")?;
            let _gecos = fields.next().context("Get passwd gecos")?;
            let home = fields.next().context("Get passwd home")?;

            return Ok(Some(PasswdEntry {
                name: name.to_string(),
                uid: uid.parse().context("Parse passwd uid")?,
                gid: gid.parse().context("Parse passwd gid")?,
                home: PathBuf::from(home),
            }));
        }
    }
    Ok(None)
}

/// Look up a group's GID in a group database file.
fn group_lookup(path: &Path, group_name: &str) -> ah::Result<Option<u32>> {
    let data = read_to_string(path).context("Read /etc/group database")?;

    for line in data.lines() {
        let mut fields = line.splitn(4, ':');

        let name = fields.next().context("Get group name")?;
        if name == group_name {
            let _pw = fields.next().context("Get group password")?;
            let gid = fields.next().context("Get group gid")?;

            return Ok(Some(gid.parse().context("Parse group gid")?));
        }
    }
    Ok(None)
}

/// Look up a user in `/etc/passwd`.
pub fn get_user(user_name: &str) -> ah::Result<Option<PasswdEntry>> {
    passwd_lookup(Path::new(ETC_PASSWD), user_name)
}

/// Probe `/etc/group` for the administrative group of this host.
///
/// The group name differs between distributions (`sudo` on Debian
/// derivatives, `wheel` on Fedora/Arch and the BSDs).
/// Returns `None` if no candidate exists; the caller must warn
/// instead of guessing.
pub fn detect_admin_group() -> ah::Result<Option<&'static str>> {
    detect_admin_group_in(Path::new(ETC_GROUP))
}

fn detect_admin_group_in(path: &Path) -> ah::Result<Option<&'static str>> {
    for &group in ADMIN_GROUPS {
        if group_lookup(path, group)?.is_some() {
            return Ok(Some(group));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::write;
    use tempfile::tempdir;

    const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
admin:x:1000:1000:Admin:/home/admin:/bin/bash
";

    #[test]
    fn test_passwd_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("passwd");
        write(&path, PASSWD).unwrap();

        let entry = passwd_lookup(&path, "admin").unwrap().unwrap();
        assert_eq!(entry.name, "admin");
        assert_eq!(entry.uid, 1000);
        assert_eq!(entry.gid, 1000);
        assert_eq!(entry.home, PathBuf::from("/home/admin"));

        assert!(passwd_lookup(&path, "nobody9").unwrap().is_none());
    }

    #[test]
    fn test_group_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("group");
        write(&path, "root:x:0:\nwheel:x:10:admin\n").unwrap();

        assert_eq!(group_lookup(&path, "wheel").unwrap(), Some(10));
        assert!(group_lookup(&path, "sudo").unwrap().is_none());
    }

    #[test]
    fn test_admin_group_probe_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("group");

        write(&path, "sudo:x:27:\nwheel:x:10:\n").unwrap();
        assert_eq!(detect_admin_group_in(&path).unwrap(), Some("sudo"));

        write(&path, "wheel:x:10:\n").unwrap();
        assert_eq!(detect_admin_group_in(&path).unwrap(), Some("wheel"));

        write(&path, "users:x:100:\n").unwrap();
        assert_eq!(detect_admin_group_in(&path).unwrap(), None);
    }
}

// vim: ts=4 sw=4 expandtab
