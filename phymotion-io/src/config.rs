//! Controller configuration and creation.

use std::time::Duration;

use log::{debug, info};

use crate::errors::Error;
use crate::io::batch::CommandOutcome;
use crate::io::{
    check_card, IoController, IoTransport, PhytronIo, Serial, Tcp, DEFAULT_BAUD_RATE,
};
use crate::registry::Registry;

/// Default response timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// How to reach the controller.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportConfig {
    Serial {
        path: String,
        #[cfg_attr(feature = "serde", serde(default = "default_baud_rate"))]
        baud_rate: u32,
    },
    Tcp {
        /// `host` or `host:port`.
        address: String,
    },
}

#[cfg(feature = "serde")]
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

#[cfg(feature = "serde")]
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl TransportConfig {
    pub fn serial<P: Into<String>>(path: P) -> Self {
        Self::Serial {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    pub fn tcp<A: Into<String>>(address: A) -> Self {
        Self::Tcp {
            address: address.into(),
        }
    }

    /// Builds the (not yet opened) transport.
    pub fn build(&self) -> Box<dyn IoTransport> {
        match self {
            TransportConfig::Serial { path, baud_rate } => {
                Box::new(Serial::new(path.as_str()).with_baud_rate(*baud_rate))
            }
            TransportConfig::Tcp { address } => Box::new(Tcp::new(address.as_str())),
        }
    }
}

/// Everything needed to create one controller.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Logical port name, unique within a [`Registry`].
    pub port: String,
    pub transport: TransportConfig,
    /// Slot number of the I/O card.
    pub card: u8,
    #[cfg_attr(feature = "serde", serde(default = "default_timeout_ms"))]
    pub timeout_ms: u64,
    /// Commands applied once connected: `"cmd1; cmd2"`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub init: String,
}

impl ControllerConfig {
    pub fn new<N: Into<String>>(port: N, card: u8, transport: TransportConfig) -> Self {
        Self {
            port: port.into(),
            transport,
            card,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            init: String::new(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_init<S: Into<String>>(mut self, init: S) -> Self {
        self.init = init.into();
        self
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parses a single configuration.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|err| Error::ConfigError {
            info: err.to_string(),
        })
    }

    /// Parses a list of configurations.
    #[cfg(feature = "serde")]
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, Error> {
        serde_json::from_str(json).map_err(|err| Error::ConfigError {
            info: err.to_string(),
        })
    }

    /// Creates, connects and registers the controller, then applies the `init` commands.
    ///
    /// # Errors
    /// * `DuplicatePort`: the port name is taken (the transport is left untouched).
    /// * `InvalidCard`: card out of range.
    /// * any transport opening error.
    pub fn create(&self, registry: &Registry) -> Result<(PhytronIo, Vec<CommandOutcome>), Error> {
        self.create_with_transport(registry, self.transport.build())
    }

    /// Same as [`ControllerConfig::create`] with an already built transport.
    pub fn create_with_transport(
        &self,
        registry: &Registry,
        transport: Box<dyn IoTransport>,
    ) -> Result<(PhytronIo, Vec<CommandOutcome>), Error> {
        check_card(self.card)?;

        // Registering first reserves the name: the transport is only opened by the winner.
        let controller = PhytronIo::from_transport(self.port.as_str(), self.card, transport)
            .with_timeout(self.get_timeout());
        registry.register(controller.clone())?;
        if let Err(error) = controller.open() {
            registry.remove(&self.port);
            return Err(error);
        }
        info!("{}: controller created", controller);

        let outcomes = controller.configure(&self.init);
        debug!("{}: {} init command(s) applied", self.port, outcomes.len());
        Ok((controller, outcomes))
    }
}
