// # Command IP Resolver
//
// Resolves the current address by running `ip_address_from_cmd` and
// parsing its trimmed output as an IPv4/IPv6 literal.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::{CommandRunner, IpResolver};

/// [`IpResolver`] that runs a command
pub struct CommandIpResolver {
    command: String,
    runner: Arc<dyn CommandRunner>,
}

impl CommandIpResolver {
    /// Create a resolver for `command`, executed through `runner`
    pub fn new(command: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            command: command.into(),
            runner,
        }
    }
}

#[async_trait]
impl IpResolver for CommandIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        if self.command.trim().is_empty() {
            return Err(Error::resolution("IP command is empty"));
        }

        let output = self.runner.run(&self.command).await.map_err(|e| match e {
            Error::CommandFailed { status, output, .. } => Error::resolution(format!(
                "`{}` exited with {}: {}",
                self.command, status, output
            )),
            other => Error::resolution(format!("`{}`: {}", self.command, other)),
        })?;

        parse_address(&output)
    }

    fn describe(&self) -> String {
        self.command.clone()
    }
}

/// Parse probe output as an address
pub fn parse_address(output: &str) -> Result<IpAddr> {
    let candidate = output.trim();
    if candidate.is_empty() {
        return Err(Error::resolution("command returned empty output"));
    }

    candidate
        .parse()
        .map_err(|_| Error::resolution(format!("'{}' is not an IP address", candidate)))
}

impl std::fmt::Debug for CommandIpResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandIpResolver")
            .field("command", &self.command)
            .finish()
    }
}
