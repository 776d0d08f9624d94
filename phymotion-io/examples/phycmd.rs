//! Sends one raw command to a phyMOTION controller and prints its response.
//!
//! Usage: `cargo run --example phycmd -- <address> <command>`
//! (e.g. `192.168.0.10 IM1`, or `/dev/ttyUSB0 IM1` for a serial line).

use phymotion_io::config::{ControllerConfig, TransportConfig};
use phymotion_io::diagnostics;
use phymotion_io::registry::Registry;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: phycmd <address> <command>");
        std::process::exit(1);
    }

    let transport = match args[0].starts_with('/') || args[0].starts_with("COM") {
        true => TransportConfig::serial(args[0].as_str()),
        false => TransportConfig::tcp(args[0].as_str()),
    };

    // The registry is what the diagnostic commands look controllers up in.
    let registry = Registry::new();
    if let Err(error) = ControllerConfig::new("IO", 1, transport).create(&registry) {
        eprintln!("Cannot connect to '{}': {}", args[0], error);
        std::process::exit(1);
    }

    match diagnostics::command(&registry, "IO", &args[1..].join(" ")) {
        Ok(response) => println!("{}", response),
        Err(error) => println!("ERROR status: '{}' ({})", error.status(), error),
    }
}
