//! Defines the phyMOTION I/O protocol engine: framing, addressing and transactions.

pub mod batch;
pub mod command;
mod controller;
pub mod frame;
mod protocol;
mod status;
mod transports;

pub use batch::CommandOutcome;
pub use command::{
    check_card, identify_command, read_command, write_command, Parameter, MAX_CARDS, MAX_CHANNEL,
};
pub use controller::*;
pub use frame::{Acknowledge, Reply};
pub use protocol::*;
pub use status::*;
pub use transports::serial::{Serial, DEFAULT_BAUD_RATE};
pub use transports::tcp::{Tcp, DEFAULT_TCP_PORT};
pub use transports::IoTransport;
