// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate implements the OS integration support shared by the
//! `provision-key` and `provision-account` tools:
//!
//! - Operator-facing error categories.
//! - External system tool invocation with exit status checking.
//! - `/etc/passwd` and `/etc/group` lookups and admin group probing.
//! - Filesystem owner/mode helpers.
//! - OpenSSH public key line validation.

#![forbid(unsafe_code)]

mod cmd;
mod error;
mod fsutil;
mod osdb;
mod pubkey;

pub use crate::{
    cmd::SystemTool,
    error::{SysError, SysErrorKind},
    fsutil::{create_dir_if_not_exists, set_owner_mode},
    osdb::{detect_admin_group, get_user, PasswdEntry},
    pubkey::{count_authorized_keys, validate_public_key},
};

// vim: ts=4 sw=4 expandtab
