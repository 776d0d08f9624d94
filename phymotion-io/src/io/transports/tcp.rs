use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::errors::Error;
use crate::errors::ProtocolError::NotInitialized;
use crate::io::transports::{read_frame, IoTransport};

/// Default TCP port of the phyMOTION Ethernet interface.
pub const DEFAULT_TCP_PORT: u16 = 22222;

/// TCP transport layer to a phyMOTION Ethernet interface (or a serial device server).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct Tcp {
    /// Remote address as `host:port`.
    address: String,
    /// Timeout applied to connection, reads and writes.
    timeout: Duration,
    #[cfg_attr(feature = "serde", serde(skip))]
    io: Arc<Mutex<Option<TcpStream>>>,
}

impl Tcp {
    /// Constructs a new `Tcp` transport layer to `address`.
    ///
    /// A missing port defaults to [`DEFAULT_TCP_PORT`].
    pub fn new<A: Into<String>>(address: A) -> Self {
        let address = address.into();
        let address = match address.contains(':') {
            true => address,
            false => format!("{}:{}", address, DEFAULT_TCP_PORT),
        };
        Self {
            address,
            timeout: Duration::from_secs(2),
            io: Arc::new(Mutex::new(None)),
        }
    }

    /// Retrieves the remote address.
    pub fn get_address(&self) -> &str {
        &self.address
    }
}

impl Display for Tcp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tcp({})", self.address)
    }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl IoTransport for Tcp {
    fn open(&mut self) -> Result<(), Error> {
        debug!("Connecting to {} (timeout {:?})", self.address, self.timeout);
        let address = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Disconnected {
                info: format!("Cannot resolve address '{}'", self.address),
            })?;

        let stream = TcpStream::connect_timeout(&address, self.timeout)?;
        if let Err(error) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on {}: {}", self.address, error);
        }
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        info!("TCP connection established to {}", self.address);

        *self.io.lock() = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(stream) = self.io.lock().take() {
            debug!("Closing TCP connection to {}", self.address);
            if let Err(error) = stream.shutdown(Shutdown::Both) {
                warn!("Failed to shutdown TCP stream {}: {}", self.address, error);
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.io.lock().is_some()
    }

    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error> {
        self.timeout = duration;
        if let Some(stream) = self.io.lock().as_ref() {
            stream.set_read_timeout(Some(duration))?;
            stream.set_write_timeout(Some(duration))?;
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), Error> {
        let mut lock = self.io.lock();
        let stream = lock.as_mut().ok_or(NotInitialized)?;
        stream.set_nonblocking(true)?;
        let mut buf = [0u8; 64];
        let drained = loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    break Err(Error::Disconnected {
                        info: String::from("Connection closed by the controller"),
                    })
                }
                Ok(_) => continue,
                Err(error) if error.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => break Err(error.into()),
            }
        };
        stream.set_nonblocking(false)?;
        drained
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut lock = self.io.lock();
        let stream = lock.as_mut().ok_or(NotInitialized)?;
        stream.write_all(buf)?;
        stream.flush()?;
        Ok(())
    }

    fn read_until(&mut self, terminator: u8, max: usize) -> Result<Vec<u8>, Error> {
        let mut lock = self.io.lock();
        let stream = lock.as_mut().ok_or(NotInitialized)?;
        read_frame(stream, terminator, max, self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Status;
    use std::net::TcpListener;
    use std::thread;

    /// Starts a fake controller answering each received frame with the next `replies`.
    fn fake_controller(replies: Vec<&'static [u8]>) -> (String, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            for reply in replies {
                let frame = read_frame(&mut stream, 0x03, 512, Duration::from_secs(5)).unwrap();
                received.extend_from_slice(&frame);
                stream.write_all(reply).unwrap();
            }
            received
        });
        (address, handle)
    }

    #[test]
    fn test_new_tcp_transport() {
        let transport = Tcp::new("192.168.0.10");
        assert_eq!(transport.get_address(), "192.168.0.10:22222");
        let transport = Tcp::new("localhost:4001");
        assert_eq!(transport.get_address(), "localhost:4001");
        assert!(!transport.is_connected());
        assert_eq!(format!("{}", transport), "Tcp(localhost:4001)");
    }

    #[test]
    fn test_write_read() {
        let (address, controller) =
            fake_controller(vec![b"\x02\x06AIODE4:XX\x03", b"\x02\x15\x03"]);
        let mut transport = Tcp::new(address);
        transport.open().unwrap();
        assert!(transport.is_connected());

        let response = transport
            .write_read(b"\x02\x30IM1:XX\x03", 0x03, 64)
            .unwrap();
        assert_eq!(response, b"\x02\x06AIODE4:XX\x03".to_vec());
        let response = transport
            .write_read(b"\x02\x30XX:XX\x03", 0x03, 64)
            .unwrap();
        assert_eq!(response, b"\x02\x15\x03".to_vec());

        transport.close().unwrap();
        assert!(!transport.is_connected());
        assert_eq!(
            controller.join().unwrap(),
            b"\x02\x30IM1:XX\x03\x02\x30XX:XX\x03".to_vec()
        );
    }

    #[test]
    fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut transport = Tcp::new(listener.local_addr().unwrap().to_string());
        transport.open().unwrap();
        transport.set_timeout(Duration::from_millis(100)).unwrap();
        let _peer = listener.accept().unwrap();

        let error = transport.read_until(0x03, 64).unwrap_err();
        assert_eq!(error.status(), Status::Timeout);
    }

    #[test]
    fn test_peer_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut transport = Tcp::new(listener.local_addr().unwrap().to_string());
        transport.open().unwrap();
        let (peer, _) = listener.accept().unwrap();
        drop(peer);

        let error = transport.read_until(0x03, 64).unwrap_err();
        assert_eq!(error.status(), Status::Disconnected);
    }

    #[test]
    fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut transport = Tcp::new(address);
        let error = transport.open().unwrap_err();
        assert_eq!(error.status(), Status::Disconnected);
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_not_initialized() {
        let mut transport = Tcp::new("127.0.0.1:1");
        assert!(transport.write(b"\x02\x30IM1:XX\x03").is_err());
        assert!(transport.read_until(0x03, 64).is_err());
        assert!(transport.clear_input().is_err());
        assert!(transport.close().is_ok());
    }
}
