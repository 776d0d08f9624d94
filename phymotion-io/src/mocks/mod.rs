//! Test doubles standing in for the hardware.

pub mod serial_port;
pub mod transport;
