//! Lists the cards installed in a phyMOTION rack.
//!
//! Usage: `cargo run --example report -- <address>`

use phymotion_io::config::{ControllerConfig, TransportConfig};
use phymotion_io::diagnostics;
use phymotion_io::io::IoController;
use phymotion_io::registry::Registry;

fn main() {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("192.168.0.10"));

    let registry = Registry::new();
    let config = ControllerConfig::new("IO", 1, TransportConfig::tcp(address.as_str()))
        .with_timeout_ms(500);
    let controller = match config.create(&registry) {
        Ok((controller, _)) => controller,
        Err(error) => {
            eprintln!("Cannot connect to '{}': {}", address, error);
            std::process::exit(1);
        }
    };

    match diagnostics::report(&registry, controller.get_name()) {
        Ok(report) => print!("{}", report),
        Err(error) => eprintln!("{}", error),
    }
}
