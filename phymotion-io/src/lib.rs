#![doc(html_root_url = "https://docs.rs/phymotion-io/0.1.0")]

//! <h1 align="center">PHYMOTION-IO - phyMOTION I/O cards control</h1>
//! <div style="text-align:center;font-style:italic;">Command/response protocol engine for the digital and analog I/O cards of a phyMOTION rack - written in Rust.</div>
//! <br/>
//!
//! # Features
//!
//! **phymotion-io** drives the I/O cards of a phyMOTION rack through its ASCII command
//! protocol, over a serial line or TCP.
//!
//! - Frame every command and decode every response ([`frame`](io::frame))
//! - Translate typed channel accesses into controller mnemonics ([`Parameter`](io::Parameter))
//! - Run one transaction at a time per rack ([`PhytronIo`](io::PhytronIo)), over [`Serial`](io::Serial) or [`Tcp`](io::Tcp)
//! - Report failures through a small [`Status`](io::Status) taxonomy, logging a failing channel once
//! - Apply configuration strings at startup ([`ControllerConfig`](config::ControllerConfig))
//! - Look controllers up by name ([`Registry`](registry::Registry)) for the [`diagnostics`] commands
//!
//! # Getting Started
//!
//! - Add the following to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! phymotion-io = "0.1.0"
//! ```
//!
//! The following code reads digital input 3 of the card in slot 2 and switches on its
//! digital output 1.
//! ```no_run
//! use phymotion_io::io::{IoController, Parameter, PhytronIo, Tcp};
//!
//! fn main() -> Result<(), phymotion_io::errors::Error> {
//!     let controller = PhytronIo::new("IO1", 2, Tcp::new("192.168.0.10"));
//!     controller.open()?;
//!
//!     let input = controller.read(Parameter::DigitalIn, 3)?;
//!     println!("Input 3: {}", input);
//!     controller.write(Parameter::DigitalOut, 1, 1)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//!
//! - **libudev** -- (enabled by default) Activates `serialport` crate _libudev_ feature under-the-hood (required on Linux only for port listing).
//! - **serde** -- Enables serialize/deserialize capabilities for configurations, statuses and transports.
//! - **mocks** -- Provides mocked transports (useful for tests mostly).

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod io;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod registry;
pub mod utils;
