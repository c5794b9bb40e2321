// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::error::SysError;
use anyhow as ah;
use std::{
    ffi::{OsStr, OsString},
    io::ErrorKind,
    process::{Command, Stdio},
};

/// One invocation of an external system tool.
///
/// Each invocation is a typed operation returning a result-or-error
/// value; callers chain them with `?` and stop at the first failure.
/// A non-zero exit status becomes an `ExternalToolFailure` carrying
/// the tool's own stderr.
#[derive(Debug)]
pub struct SystemTool {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl SystemTool {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: vec![],
            envs: vec![],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Set an environment variable in the tool's environment.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Render the command line for reporting (e.g. dry-run output).
    pub fn describe(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(' ') {
                line.push('\'');
                line.push_str(&arg);
                line.push('\'');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    fn spawn_error(&self, error: std::io::Error) -> SysError {
        let program = self.program.to_string_lossy();
        if error.kind() == ErrorKind::NotFound {
            SysError::external_tool_failure(format!("'{program}' is not installed"))
        } else {
            SysError::external_tool_failure(format!("Failed to run '{program}': {error}"))
        }
    }

    /// Run the tool with captured output.
    ///
    /// Returns the captured stdout on success.
    pub fn run(&self) -> ah::Result<String> {
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            let program = self.program.to_string_lossy();
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(SysError::external_tool_failure(format!(
                "'{program}' exited with {}: {stderr}",
                output.status,
            ))
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run the tool with inherited stdio.
    ///
    /// Used for tools that interact with the operator (e.g. passwd).
    pub fn run_interactive(&self) -> ah::Result<()> {
        let status = self.command().status().map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            let program = self.program.to_string_lossy();
            return Err(SysError::external_tool_failure(format!(
                "'{program}' exited with {status}"
            ))
            .into());
        }
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab
