//! Defines the capabilities a controller exposes to host frameworks and diagnostics.

use std::fmt::{Debug, Display};

use dyn_clone::DynClone;

use crate::errors::Error;
use crate::io::batch::{self, CommandOutcome};
use crate::io::{Parameter, Status};

// Makes a Box<dyn IoController> clone (used by the registry lookups).
dyn_clone::clone_trait_object!(IoController);

/// Defines the trait all controllers must implement.
///
/// Host framework adapters bind their own parameter/address model onto these calls.
pub trait IoController: DynClone + Send + Sync + Debug + Display {
    /// Logical port name of the controller (unique within a [`Registry`](crate::registry::Registry)).
    fn get_name(&self) -> &str;

    /// Card (slot) number this controller drives.
    fn get_card(&self) -> u8;

    /// Reads the integer value of `parameter` at `channel`.
    fn read(&self, parameter: Parameter, channel: u8) -> Result<i32, Error>;

    /// Writes `value` to `parameter` at `channel`.
    fn write(&self, parameter: Parameter, channel: u8, value: i32) -> Result<(), Error>;

    /// Sends a raw command mnemonic and returns the textual response:
    /// the data, `ACK` for a bare acknowledgement or `NACK` when rejected.
    fn command(&self, command: &str) -> Result<String, Error>;

    /// Returns the response of the last successful raw command.
    fn last_response(&self) -> String;

    /// Returns the last status seen by the reporting policy.
    fn last_status(&self) -> Status;

    /// Applies a semicolon separated list of raw commands, in order.
    fn configure(&self, config: &str) -> Vec<CommandOutcome> {
        batch::apply(config, self)
    }
}
