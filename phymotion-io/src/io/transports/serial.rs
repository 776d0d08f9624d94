use std::fmt::{Display, Formatter};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use log::trace;
use parking_lot::Mutex;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::errors::Error;
use crate::errors::ProtocolError::NotInitialized;
use crate::io::transports::{read_frame, IoTransport};

/// Default baud rate of the phyMOTION serial interface.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct Serial {
    /// The connection port.
    port: String,
    /// The line speed.
    baud_rate: u32,
    /// Timeout applied to reads and writes.
    timeout: Duration,
    /// A Read/Write io object.
    #[cfg_attr(feature = "serde", serde(skip))]
    io: Arc<Mutex<Option<Box<dyn SerialPort>>>>,
}

impl Serial {
    /// Constructs a new `Serial` transport layer instance for communication through the specified port.
    ///
    /// # Arguments
    /// * `port` - The serial port to use for communication.
    ///
    /// # Example
    /// ```
    /// use phymotion_io::io::{PhytronIo, Serial};
    ///
    /// let controller = PhytronIo::new("IO1", 1, Serial::new("/dev/ttyUSB0"));
    /// ```
    pub fn new<P: Into<String>>(port: P) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(2),
            io: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets the line speed used when the port is opened.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Retrieves the configured port.
    pub fn get_port(&self) -> String {
        self.port.clone()
    }

    /// Retrieves the configured line speed.
    pub fn get_baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Display for Serial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Serial({})", self.port)
    }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl IoTransport for Serial {
    fn open(&mut self) -> Result<(), Error> {
        let connexion = serialport::new(self.port.clone(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;
        trace!("Serial port is now opened: {:?}", connexion.name());

        *self.io.lock() = Some(connexion);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        *self.io.lock() = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.io.lock().is_some()
    }

    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error> {
        self.timeout = duration;
        if let Some(port) = self.io.lock().as_mut() {
            port.set_timeout(duration)?;
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), Error> {
        let lock = self.io.lock();
        lock.as_ref()
            .ok_or(NotInitialized)?
            .clear(ClearBuffer::Input)?;
        Ok(())
    }

    /// Write bytes to the internal connection.
    ///
    /// # Notes
    /// This function blocks until the write operation is complete.
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut lock = self.io.lock();
        let port = lock.as_mut().ok_or(NotInitialized)?;
        port.write_all(buf)?;
        port.flush()?;
        Ok(())
    }

    fn read_until(&mut self, terminator: u8, max: usize) -> Result<Vec<u8>, Error> {
        let mut lock = self.io.lock();
        let port = lock.as_mut().ok_or(NotInitialized)?;
        read_frame(&mut **port, terminator, max, self.timeout)
    }
}

impl From<serialport::Error> for Error {
    fn from(value: serialport::Error) -> Self {
        std::io::Error::from(value).into()
    }
}
