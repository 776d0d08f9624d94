use std::fmt::{Debug, Display};
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use dyn_clone::DynClone;

use crate::errors::Error;

pub mod serial;
pub mod tcp;

dyn_clone::clone_trait_object!(IoTransport);

/// Byte stream used to reach the controller (serial line, TCP socket...).
#[cfg_attr(feature = "serde", typetag::serde(tag = "type"))]
pub trait IoTransport: Debug + Display + DynClone + Send + Sync {
    /// Opens communication (in a blocking way) using the transport layer.
    ///
    /// # Notes
    ///  The method is sync and may block until the connection is established.
    fn open(&mut self) -> Result<(), Error>;

    /// Gracefully shuts down the transport layer.
    fn close(&mut self) -> Result<(), Error>;

    /// Checks if the transport has been opened.
    fn is_connected(&self) -> bool;

    /// Sets the timeout applied to every read and write.
    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error>;

    /// Discards any pending input (stale responses of previous requests).
    fn clear_input(&mut self) -> Result<(), Error>;

    /// Write bytes to the internal connection. For more details see [`std::io::Write::write_all`].
    ///
    /// # Notes
    /// This function blocks until the write operation is complete.
    fn write(&mut self, buf: &[u8]) -> Result<(), Error>;

    /// Reads until `terminator` is received (included in the returned bytes).
    ///
    /// # Errors
    /// * `Timeout`: nothing received within the transport timeout.
    /// * `Overflow`: `max` bytes received without a terminator.
    fn read_until(&mut self, terminator: u8, max: usize) -> Result<Vec<u8>, Error>;

    /// Sends a request and reads its response frame.
    fn write_read(&mut self, buf: &[u8], terminator: u8, max: usize) -> Result<Vec<u8>, Error> {
        self.clear_input()?;
        self.write(buf)?;
        self.read_until(terminator, max)
    }
}

/// Reads `reader` byte per byte until `terminator`.
///
/// The whole frame must arrive within `timeout`: each single read is also bounded by the
/// reader's own timeout. A reader returning 0 bytes has been closed by its peer.
pub(crate) fn read_frame<R: Read + ?Sized>(
    reader: &mut R,
    terminator: u8,
    max: usize,
    timeout: Duration,
) -> Result<Vec<u8>, Error> {
    let deadline = Instant::now() + timeout;
    let mut frame = Vec::with_capacity(32);
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(Error::Disconnected {
                    info: String::from("Connection closed by the controller"),
                })
            }
            Ok(_) => {
                frame.push(byte[0]);
                if byte[0] == terminator {
                    return Ok(frame);
                }
                if frame.len() >= max {
                    return Err(Error::Overflow {
                        length: frame.len(),
                        max,
                    });
                }
                if Instant::now() >= deadline {
                    return Err(Error::Timeout);
                }
            }
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        }
    }
}
