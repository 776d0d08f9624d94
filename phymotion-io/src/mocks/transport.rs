use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::Error;
use crate::errors::ProtocolError::NotInitialized;
use crate::io::frame::{ACK, ETX, NAK, SEPARATOR, SKIP_CHECKSUM, STX};
use crate::io::IoTransport;

#[derive(Debug)]
enum MockReply {
    Frame(Vec<u8>),
    Failure(ErrorKind),
}

#[derive(Debug, Default)]
struct MockTransportData {
    connected: bool,
    open_failure: Option<ErrorKind>,
    timeout: Duration,
    replies: VecDeque<MockReply>,
    /// Answer requests with their own payload when no reply is queued.
    echo: bool,
    written: Vec<Vec<u8>>,
    latency: Duration,
    /// Number of calls currently inside the transport.
    active: usize,
    /// Number of times a call entered while another one was running.
    overlaps: usize,
}

/// Mock implementation of [`IoTransport`] simulating a phyMOTION controller.
///
/// Replies are queued beforehand and consumed one per read. When none is left, a read
/// times out (or echoes the request in echo mode). Clones share the same data.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    #[cfg_attr(feature = "serde", serde(skip))]
    data: Arc<Mutex<MockTransportData>>,
}

impl MockTransport {
    /// Queues a data reply: `<STX><ACK>data:XX<ETX>`.
    pub fn reply(&self, data: &str) -> &Self {
        let mut frame = vec![STX, ACK];
        frame.extend_from_slice(data.as_bytes());
        frame.push(SEPARATOR);
        frame.extend_from_slice(SKIP_CHECKSUM);
        frame.push(ETX);
        self.frame(&frame)
    }

    /// Queues a bare acknowledgement: `<STX><ACK><ETX>`.
    pub fn ack(&self) -> &Self {
        self.frame(&[STX, ACK, ETX])
    }

    /// Queues a negative acknowledgement: `<STX><NAK><ETX>`.
    pub fn nak(&self) -> &Self {
        self.frame(&[STX, NAK, ETX])
    }

    /// Queues raw bytes as the next response.
    pub fn frame(&self, bytes: &[u8]) -> &Self {
        self.data
            .lock()
            .replies
            .push_back(MockReply::Frame(bytes.to_vec()));
        self
    }

    /// Queues an I/O failure of the given kind as the next response.
    pub fn failure(&self, kind: ErrorKind) -> &Self {
        self.data.lock().replies.push_back(MockReply::Failure(kind));
        self
    }

    /// Makes the next `open` fail with the given kind of error.
    pub fn fail_open(&self, kind: ErrorKind) -> &Self {
        self.data.lock().open_failure = Some(kind);
        self
    }

    /// Answers every request with its own payload.
    pub fn echo(&self) -> &Self {
        self.data.lock().echo = true;
        self
    }

    /// Delays every write and read by `latency`.
    pub fn latency(&self, latency: Duration) -> &Self {
        self.data.lock().latency = latency;
        self
    }

    /// Marks the transport as opened.
    pub fn connected(self) -> Self {
        self.data.lock().connected = true;
        self
    }

    /// Retrieves every frame written so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.data.lock().written.clone()
    }

    /// Retrieves the payload of every frame written so far.
    pub fn commands(&self) -> Vec<String> {
        self.written()
            .iter()
            .map(|frame| String::from_utf8_lossy(request_payload(frame)).to_string())
            .collect()
    }

    /// Number of times two calls were running at the same time.
    pub fn overlaps(&self) -> usize {
        self.data.lock().overlaps
    }

    pub fn get_timeout(&self) -> Duration {
        self.data.lock().timeout
    }

    fn enter(&self) -> Duration {
        let mut data = self.data.lock();
        data.active += 1;
        if data.active > 1 {
            data.overlaps += 1;
        }
        data.latency
    }

    fn leave(&self) {
        self.data.lock().active -= 1;
    }
}

/// Extracts the payload of a `<STX><ADDR>payload:XX<ETX>` request.
fn request_payload(frame: &[u8]) -> &[u8] {
    match frame.len() {
        len if len >= 6 => &frame[2..len - 4],
        _ => &[],
    }
}

impl Display for MockTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockTransport")
    }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl IoTransport for MockTransport {
    fn open(&mut self) -> Result<(), Error> {
        let mut data = self.data.lock();
        if let Some(kind) = data.open_failure.take() {
            return Err(std::io::Error::from(kind).into());
        }
        data.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.data.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.data.lock().connected
    }

    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error> {
        self.data.lock().timeout = duration;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), Error> {
        match self.data.lock().connected {
            true => Ok(()),
            false => Err(NotInitialized.into()),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let latency = self.enter();
        thread::sleep(latency);
        let result = {
            let mut data = self.data.lock();
            match data.connected {
                true => {
                    data.written.push(buf.to_vec());
                    Ok(())
                }
                false => Err(NotInitialized.into()),
            }
        };
        self.leave();
        result
    }

    fn read_until(&mut self, _: u8, max: usize) -> Result<Vec<u8>, Error> {
        let latency = self.enter();
        thread::sleep(latency);
        let result = {
            let mut data = self.data.lock();
            match data.replies.pop_front() {
                Some(MockReply::Frame(frame)) if frame.len() > max => Err(Error::Overflow {
                    length: frame.len(),
                    max,
                }),
                Some(MockReply::Frame(frame)) => Ok(frame),
                Some(MockReply::Failure(kind)) => Err(std::io::Error::from(kind).into()),
                None if data.echo => {
                    let request = data.written.last().cloned().unwrap_or_default();
                    let mut frame = vec![STX, ACK];
                    frame.extend_from_slice(request_payload(&request));
                    frame.push(SEPARATOR);
                    frame.extend_from_slice(SKIP_CHECKSUM);
                    frame.push(ETX);
                    Ok(frame)
                }
                None => Err(Error::Timeout),
            }
        };
        self.leave();
        result
    }
}
