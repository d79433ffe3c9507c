// # Command Runner Trait
//
// Executes whitespace-tokenized commands without a shell.
//
// Used for three things: the IP probe, the post-update hook and the
// post-startup command. The hook and startup command are `;`-separated
// sequences run best-effort through [`CommandRunner::run_sequence`].

use async_trait::async_trait;
use tracing::{debug, warn};

/// Outcome of one segment of a command sequence
#[derive(Debug)]
pub struct StepOutcome {
    /// The segment as executed (trimmed)
    pub command: String,
    /// Output on success, the error otherwise
    pub result: Result<String, crate::Error>,
}

impl StepOutcome {
    /// Whether the step exited successfully
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Trait for command execution
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command and return its combined, trimmed output
    ///
    /// The command is split on whitespace; the first token is the program.
    ///
    /// # Errors
    ///
    /// - `Error::Command`: empty command or the program could not be started
    /// - `Error::CommandFailed`: nonzero exit, output retained
    async fn run(&self, command: &str) -> Result<String, crate::Error>;

    /// Run each non-empty `;`-separated segment in order
    ///
    /// A failing segment is logged and does not stop the rest.
    async fn run_sequence(&self, commands: &str) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();

        for segment in commands.split(';').map(str::trim) {
            if segment.is_empty() {
                continue;
            }

            let result = self.run(segment).await;
            match &result {
                Ok(output) => debug!(command = segment, output = %output, "Sequence step succeeded"),
                Err(e) => warn!(command = segment, error = %e, "Sequence step failed, continuing"),
            }

            outcomes.push(StepOutcome {
                command: segment.to_string(),
                result,
            });
        }

        outcomes
    }
}
