// -*- coding: utf-8 -*-
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, format_err as err, Context as _};
use provision_sys::SystemTool;
use std::{
    env,
    path::{Path, PathBuf},
};

/// Handle to a running ssh-agent.
///
/// The handle is resolved once and passed explicitly to the
/// registration step, instead of every step consulting the
/// process environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentHandle {
    /// Path to the agent's UNIX socket.
    pub auth_sock: PathBuf,

    /// The agent's PID, if known.
    pub pid: Option<u32>,
}

/// Find a reachable agent, or start a new one.
///
/// An agent advertised by `SSH_AUTH_SOCK` is reused if its socket
/// still exists. Otherwise `ssh-agent -s` is spawned and its output
/// parsed into a fresh handle.
pub fn ensure_agent() -> ah::Result<AgentHandle> {
    if let Some(sock) = env::var_os("SSH_AUTH_SOCK") {
        let auth_sock = PathBuf::from(sock);
        if auth_sock.exists() {
            let pid = env::var("SSH_AGENT_PID")
                .ok()
                .and_then(|pid| pid.parse().ok());
            return Ok(AgentHandle { auth_sock, pid });
        }
        eprintln!("Warning: SSH_AUTH_SOCK points at a dead socket. Starting a new agent.");
    }
    let output = SystemTool::new("ssh-agent")
        .arg("-s")
        .run()
        .context("Start ssh-agent")?;
    parse_agent_output(&output)
}

/// Parse the `eval`-able output of `ssh-agent -s`.
fn parse_agent_output(output: &str) -> ah::Result<AgentHandle> {
    let mut auth_sock = None;
    let mut pid = None;
    for line in output.lines() {
        for part in line.split(';') {
            let part = part.trim();
            if let Some(value) = part.strip_prefix("SSH_AUTH_SOCK=") {
                auth_sock = Some(PathBuf::from(value));
            } else if let Some(value) = part.strip_prefix("SSH_AGENT_PID=") {
                pid = value.parse().ok();
            }
        }
    }
    let Some(auth_sock) = auth_sock else {
        return Err(err!("Could not find SSH_AUTH_SOCK in ssh-agent output."));
    };
    Ok(AgentHandle { auth_sock, pid })
}

/// Register a private key with the agent.
pub fn add_key(agent: &AgentHandle, private_key: &Path) -> ah::Result<()> {
    SystemTool::new("ssh-add")
        .arg(private_key)
        .env("SSH_AUTH_SOCK", &agent.auth_sock)
        .run()
        .context("Register key with ssh-agent")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_output() {
        let output = "\
SSH_AUTH_SOCK=/tmp/ssh-abc123/agent.42; export SSH_AUTH_SOCK;
SSH_AGENT_PID=43; export SSH_AGENT_PID;
echo Agent pid 43;
";
        let agent = parse_agent_output(output).unwrap();
        assert_eq!(agent.auth_sock, PathBuf::from("/tmp/ssh-abc123/agent.42"));
        assert_eq!(agent.pid, Some(43));
    }

    #[test]
    fn test_parse_agent_output_without_pid() {
        let output = "SSH_AUTH_SOCK=/tmp/agent.0; export SSH_AUTH_SOCK;\n";
        let agent = parse_agent_output(output).unwrap();
        assert_eq!(agent.auth_sock, PathBuf::from("/tmp/agent.0"));
        assert_eq!(agent.pid, None);
    }

    #[test]
    fn test_parse_agent_output_garbage() {
        assert!(parse_agent_output("").is_err());
        assert!(parse_agent_output("Agent pid 43\n").is_err());
    }
}

// vim: ts=4 sw=4 expandtab
