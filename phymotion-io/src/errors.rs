use std::io::ErrorKind;
use std::str::Utf8Error;

use log::error;
use snafu::Snafu;

use crate::io::{Parameter, Status};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Timeout: no response received from the controller
    Timeout,
    /// Overflow: {length} bytes exceed the {max} bytes frame limit
    Overflow { length: usize, max: usize },
    /// Protocol error: {source}.
    ProtocolError { source: ProtocolError },
    /// Disconnected: {info}.
    Disconnected { info: String },
    /// Disabled: the controller is disabled
    Disabled,
    /// Hardware error: {source}.
    HardwareError { source: HardwareError },
    /// Registry error: {source}.
    RegistryError { source: RegistryError },
    /// Configuration error: {info}.
    ConfigError { info: String },
}

impl Error {
    /// Maps the error onto the stable [`Status`] taxonomy reported to callers.
    pub fn status(&self) -> Status {
        match self {
            Error::Timeout => Status::Timeout,
            Error::Overflow { .. } => Status::Overflow,
            Error::Disconnected { .. } => Status::Disconnected,
            Error::ProtocolError {
                source: ProtocolError::NotInitialized,
            } => Status::Disconnected,
            Error::Disabled => Status::Disabled,
            Error::ProtocolError { .. }
            | Error::HardwareError { .. }
            | Error::RegistryError { .. }
            | Error::ConfigError { .. } => Status::ProtocolError,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout,
            ErrorKind::NotFound => Self::Disconnected {
                info: String::from("Controller not found or already in use"),
            },
            ErrorKind::PermissionDenied
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof => Self::Disconnected {
                info: error.to_string(),
            },
            _ => {
                error!("std::io error {:?}", error);
                Self::ProtocolError {
                    source: ProtocolError::IoException {
                        info: error.to_string(),
                    },
                }
            }
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(value: ProtocolError) -> Self {
        Self::ProtocolError { source: value }
    }
}

impl From<HardwareError> for Error {
    fn from(value: HardwareError) -> Self {
        Self::HardwareError { source: value }
    }
}

impl From<RegistryError> for Error {
    fn from(value: RegistryError) -> Self {
        Self::RegistryError { source: value }
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::ProtocolError {
            source: ProtocolError::UnexpectedData {
                data: value.to_string(),
            },
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProtocolError {
    /// {info}
    IoException { info: String },
    /// Connection has not been initialized
    NotInitialized,
    /// Not enough bytes received - expected at least {expected} bytes, {received} received
    MessageTooShort { expected: usize, received: usize },
    /// Malformed frame received [{frame}]
    MalformedFrame { frame: String },
    /// Command '{command}' not acknowledged
    NotAcknowledged { command: String },
    /// Unexpected data received: '{data}'
    UnexpectedData { data: String },
    /// Empty command
    EmptyCommand,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HardwareError {
    /// Invalid card number {card}, must be in range 1 to {max}
    InvalidCard { card: u8, max: u8 },
    /// Invalid channel {channel} - {context}
    InvalidChannel { channel: u8, context: &'static str },
    /// Parameter ({parameter}) does not support {operation}
    UnsupportedOperation {
        parameter: Parameter,
        operation: &'static str,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RegistryError {
    /// Port '{name}' already defined
    DuplicatePort { name: String },
    /// Cannot find controller '{name}'
    UnknownPort { name: String },
}
