// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

/// Broad failure category reported to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysErrorKind {
    /// Malformed or contradictory operator input.
    InvalidArgument,

    /// Missing privilege or an unreadable filesystem object.
    PermissionDenied,

    /// A referenced filesystem object does not exist.
    NotFound,

    /// The target object already exists.
    ///
    /// This is a soft condition for account provisioning: the caller
    /// reports it and continues with the remaining idempotent steps.
    AlreadyExists,

    /// An underlying system tool exited with a non-zero status.
    ExternalToolFailure,
}

impl fmt::Display for SysErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::PermissionDenied => write!(f, "Permission denied"),
            Self::NotFound => write!(f, "Not found"),
            Self::AlreadyExists => write!(f, "Already exists"),
            Self::ExternalToolFailure => write!(f, "External tool failure"),
        }
    }
}

/// Operator-facing error with a broad category attached.
///
/// Interoperates with `anyhow` via [std::error::Error].
/// The category can be recovered from an `anyhow::Error` chain
/// with `downcast_ref::<SysError>()`.
#[derive(Clone, Debug)]
pub struct SysError {
    kind: SysErrorKind,
    msg: String,
}

impl SysError {
    pub fn new(kind: SysErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(SysErrorKind::InvalidArgument, msg)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::new(SysErrorKind::PermissionDenied, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(SysErrorKind::NotFound, msg)
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::new(SysErrorKind::AlreadyExists, msg)
    }

    pub fn external_tool_failure(msg: impl Into<String>) -> Self {
        Self::new(SysErrorKind::ExternalToolFailure, msg)
    }

    /// Get the broad failure category.
    pub fn kind(&self) -> SysErrorKind {
        self.kind
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for SysError {}


// vim: ts=4 sw=4 expandtab
