// # Process Command Runner
//
// Runs commands as child processes with no shell in between: the command
// line is split on whitespace, so quoting, pipes and redirections are not
// interpreted. Wrap the command in `sh -c` yourself if you need them.
//
// Output is stdout followed by stderr, trimmed.

use async_trait::async_trait;
use std::process::Stdio;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::CommandRunner;

/// Placeholder replaced with the new address in hook templates
pub const HOOK_PLACEHOLDER: &str = "${IP_ADDRESS}";

/// Substitute the address into a hook template
///
/// Every occurrence of [`HOOK_PLACEHOLDER`] is replaced literally.
pub fn render_hook(template: &str, address: &str) -> String {
    template.replace(HOOK_PLACEHOLDER, address)
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, command: &str) -> Result<String> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::command("command is empty"))?;

        debug!(command, "Running command");

        let output = tokio::process::Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::command(format!("failed to start `{}`: {}", command, e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if !output.status.success() {
            warn!(command, status = %output.status, output = %combined, "Command failed");
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                output: combined,
            });
        }

        debug!(command, output = %combined, "Command succeeded");
        Ok(combined)
    }
}
