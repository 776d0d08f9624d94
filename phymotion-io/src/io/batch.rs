//! Application of configuration strings: `"cmd1; cmd2; cmd3"`.

use std::fmt::{Display, Formatter};

use log::{debug, error};

use crate::io::{IoController, Status};

/// Response text reported for a command that failed at transport or protocol level.
pub const ERROR_RESPONSE: &str = "ERR";

/// Result of one command of a batch.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    /// Response text (`ERR` when the command failed).
    pub response: String,
    pub status: Status,
}

impl CommandOutcome {
    /// Indicates if the command went through and was acknowledged.
    pub fn is_ok(&self) -> bool {
        self.status.is_success() && self.response != "NACK"
    }
}

impl Display for CommandOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'\t'{}'\t{}", self.command, self.response, self.status)
    }
}

/// Splits a configuration string into trimmed commands.
///
/// A trailing `;` ends the sequence. Any other empty segment is kept as a command.
pub fn split_commands(config: &str) -> Vec<&str> {
    let mut commands: Vec<&str> = config.split(';').map(str::trim).collect();
    if commands.last().is_some_and(|command| command.is_empty()) {
        commands.pop();
    }
    commands
}

/// Sends every command of `config` through `controller`, in order.
///
/// A failing command does not stop the batch: each outcome is reported.
pub fn apply<C: IoController + ?Sized>(config: &str, controller: &C) -> Vec<CommandOutcome> {
    split_commands(config)
        .into_iter()
        .map(|command| {
            let outcome = match controller.command(command) {
                Ok(response) => CommandOutcome {
                    command: command.to_string(),
                    response,
                    status: Status::Success,
                },
                Err(err) => {
                    error!(
                        "{}: set param failed: '{}' {}",
                        controller.get_name(),
                        command,
                        err
                    );
                    CommandOutcome {
                        command: command.to_string(),
                        response: String::from(ERROR_RESPONSE),
                        status: err.status(),
                    }
                }
            };
            if outcome.status.is_success() && !outcome.is_ok() {
                error!(
                    "{}: set param failed: '{}' {}",
                    controller.get_name(),
                    command,
                    outcome.response
                );
            }
            debug!("{}: set: {}", controller.get_name(), outcome);
            outcome
        })
        .collect()
}
