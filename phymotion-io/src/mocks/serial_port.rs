use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serialport::{
    ClearBuffer, DataBits, Error, ErrorKind, FlowControl, Parity, SerialPort, StopBits,
};

#[derive(Debug, Default)]
struct SerialPortData {
    /// Bytes waiting in the input buffer.
    input: VecDeque<u8>,
    /// Frames the "controller" sends back, one per write.
    replies: VecDeque<Vec<u8>>,
    /// Every byte written so far.
    written: Vec<u8>,
    timeout: Duration,
}

/// Mock implementation of a [`SerialPort`] answering writes with queued replies.
///
/// Clones share the same buffers, so a test can keep a handle on the mock it gave away.
#[derive(Debug, Default, Clone)]
pub struct SerialPortMock {
    error: Option<Error>,
    data: Arc<Mutex<SerialPortData>>,
}

impl SerialPortMock {
    /// Creates a mock failing every operation with the given `kind` of error.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            error: Some(Error::new(kind, "Mock error reason")),
            data: Default::default(),
        }
    }

    /// Adds bytes already pending in the input buffer.
    pub fn with_input(self, bytes: &[u8]) -> Self {
        self.data.lock().input.extend(bytes);
        self
    }

    /// Queues a reply made available after the next write.
    pub fn with_reply(self, bytes: &[u8]) -> Self {
        self.data.lock().replies.push_back(bytes.to_vec());
        self
    }

    /// Retrieves all bytes written to the port.
    pub fn written(&self) -> Vec<u8> {
        self.data.lock().written.clone()
    }

    fn check(&self) -> serialport::Result<()> {
        match &self.error {
            None => Ok(()),
            Some(error) => Err(error.clone()),
        }
    }

    fn io_check(&self) -> std::io::Result<()> {
        match self.error {
            None => Ok(()),
            Some(_) => Err(std::io::Error::from(std::io::ErrorKind::InvalidData)),
        }
    }
}

impl SerialPort for SerialPortMock {
    fn name(&self) -> Option<String> {
        Some(String::from("SerialPortMock"))
    }

    fn baud_rate(&self) -> serialport::Result<u32> {
        self.check().map(|_| 115_200)
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        self.check().map(|_| DataBits::Eight)
    }

    fn flow_control(&self) -> serialport::Result<FlowControl> {
        self.check().map(|_| FlowControl::None)
    }

    fn parity(&self) -> serialport::Result<Parity> {
        self.check().map(|_| Parity::None)
    }

    fn stop_bits(&self) -> serialport::Result<StopBits> {
        self.check().map(|_| StopBits::One)
    }

    fn timeout(&self) -> Duration {
        self.data.lock().timeout
    }

    fn set_baud_rate(&mut self, _: u32) -> serialport::Result<()> {
        self.check()
    }

    fn set_data_bits(&mut self, _: DataBits) -> serialport::Result<()> {
        self.check()
    }

    fn set_flow_control(&mut self, _: FlowControl) -> serialport::Result<()> {
        self.check()
    }

    fn set_parity(&mut self, _: Parity) -> serialport::Result<()> {
        self.check()
    }

    fn set_stop_bits(&mut self, _: StopBits) -> serialport::Result<()> {
        self.check()
    }

    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.check()?;
        self.data.lock().timeout = timeout;
        Ok(())
    }

    fn write_request_to_send(&mut self, _: bool) -> serialport::Result<()> {
        self.check()
    }

    fn write_data_terminal_ready(&mut self, _: bool) -> serialport::Result<()> {
        self.check()
    }

    fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
        self.check().map(|_| true)
    }

    fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
        self.check().map(|_| true)
    }

    fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
        self.check().map(|_| false)
    }

    fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
        self.check().map(|_| true)
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        self.check()?;
        Ok(self.data.lock().input.len() as u32)
    }

    fn bytes_to_write(&self) -> serialport::Result<u32> {
        self.check().map(|_| 0)
    }

    fn clear(&self, buffer: ClearBuffer) -> serialport::Result<()> {
        self.check()?;
        if matches!(buffer, ClearBuffer::Input | ClearBuffer::All) {
            self.data.lock().input.clear();
        }
        Ok(())
    }

    fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
        self.check()?;
        Ok(Box::new(self.clone()))
    }

    fn set_break(&self) -> serialport::Result<()> {
        self.check()
    }

    fn clear_break(&self) -> serialport::Result<()> {
        self.check()
    }
}

impl Read for SerialPortMock {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.io_check()?;
        let mut data = self.data.lock();
        if data.input.is_empty() {
            return Err(std::io::Error::from(std::io::ErrorKind::TimedOut));
        }
        let len = buf.len().min(data.input.len());
        for (slot, byte) in buf.iter_mut().zip(data.input.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

impl Write for SerialPortMock {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.io_check()?;
        let mut data = self.data.lock();
        data.written.extend_from_slice(buf);
        if let Some(reply) = data.replies.pop_front() {
            data.input.extend(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.io_check()
    }
}
