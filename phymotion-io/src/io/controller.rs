use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, trace};
use parking_lot::Mutex;

use crate::errors::{Error, ProtocolError};
use crate::io::command::{read_command, write_command};
use crate::io::frame::{decode, encode, Reply, ETX, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
use crate::io::{IoController, IoTransport, Parameter, Status, StatusPolicy};
use crate::utils::{to_hex, to_printable};

/// Default response timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything mutated by a transaction: only accessed with the controller lock held.
#[derive(Debug)]
struct ControllerState {
    transport: Box<dyn IoTransport>,
    timeout: Duration,
    policy: StatusPolicy,
    /// Response of the last successful raw command (at most [`MAX_PAYLOAD_SIZE`] bytes).
    last_response: String,
}

impl ControllerState {
    /// Sends `payload` and decodes the response frame.
    fn transact(&mut self, payload: &str) -> Result<Reply, Error> {
        let frame = encode(payload)?;
        trace!("cmd '{}' write: [{}]", payload, to_hex(&frame));
        let response = self.transport.write_read(&frame, ETX, MAX_FRAME_SIZE)?;
        trace!(
            "cmd '{}' response {}: '{}' [{}]",
            payload,
            response.len(),
            to_printable(&response),
            to_hex(&response)
        );
        decode(&response)
    }

    /// Sends `payload` without waiting for a response.
    fn send(&mut self, payload: &str) -> Result<(), Error> {
        let frame = encode(payload)?;
        trace!("cmd '{}' write: [{}]", payload, to_hex(&frame));
        self.transport.write(&frame)
    }

    /// Logs the outcome of a call when it changes the reported status.
    fn report<T>(&mut self, name: &str, command: &str, result: &Result<T, Error>) {
        let status = match result {
            Ok(_) => Status::Success,
            Err(err) => err.status(),
        };
        if self.policy.report(status) {
            match result {
                Ok(_) => info!("{}: communication restored", name),
                Err(err) => error!(
                    "{}: '{}' failed with status {}: {}",
                    name, command, status, err
                ),
            }
        }
    }
}

/// Controls one phyMOTION I/O card through a transport layer.
///
/// Clones share the same transport: at most one transaction is in flight at any time,
/// concurrent callers wait for their turn.
#[derive(Clone, Debug)]
pub struct PhytronIo {
    /// Logical port name.
    name: String,
    /// Slot number of the card (from 1).
    card: u8,
    state: Arc<Mutex<ControllerState>>,
}

impl PhytronIo {
    /// Creates a controller for `card`, reachable through `transport`.
    ///
    /// **_/!\ The transport is NOT opened until the [`PhytronIo::open`] method is called._**
    ///
    /// # Example
    /// ```
    /// use phymotion_io::io::{PhytronIo, Tcp};
    /// use std::time::Duration;
    ///
    /// let controller = PhytronIo::new("IO1", 2, Tcp::new("192.168.0.10"))
    ///     .with_timeout(Duration::from_millis(500));
    /// ```
    pub fn new<N: Into<String>, T: IoTransport + 'static>(name: N, card: u8, transport: T) -> Self {
        Self::from_transport(name, card, Box::new(transport))
    }

    /// Creates a controller from an already boxed transport.
    pub fn from_transport<N: Into<String>>(
        name: N,
        card: u8,
        transport: Box<dyn IoTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            card,
            state: Arc::new(Mutex::new(ControllerState {
                transport,
                timeout: DEFAULT_TIMEOUT,
                policy: StatusPolicy::default(),
                last_response: String::new(),
            })),
        }
    }

    /// Sets the response timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.state.lock().timeout = timeout;
        self
    }

    /// Opens the underlying transport.
    pub fn open(&self) -> Result<(), Error> {
        let mut state = self.state.lock();
        let timeout = state.timeout;
        state.transport.set_timeout(timeout)?;
        state.transport.open()?;
        debug!("{}: connected through {}", self.name, state.transport);
        Ok(())
    }

    /// Gracefully closes the underlying transport.
    pub fn close(&self) -> Result<(), Error> {
        self.state.lock().transport.close()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().transport.is_connected()
    }

    pub fn get_timeout(&self) -> Duration {
        self.state.lock().timeout
    }

    /// Changes the response timeout of the next transactions.
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.transport.set_timeout(timeout)?;
        state.timeout = timeout;
        Ok(())
    }

    /// Sends `payload` and waits for the controller response.
    ///
    /// A negative acknowledgement is a successful transaction: check [`Reply::is_ack`].
    ///
    /// # Errors
    /// * `Overflow`: the payload does not fit in a frame (nothing is sent).
    /// * `Timeout`, `Disconnected`: transport failures.
    /// * `ProtocolError`: the response is not a valid frame.
    pub fn execute(&self, payload: &str) -> Result<Reply, Error> {
        let mut state = self.state.lock();
        let result = state.transact(payload);
        state.report(&self.name, payload, &result);
        result
    }

    /// Sends `payload` without waiting for (nor parsing) a response.
    ///
    /// The controller still answers: that response is discarded when the next transaction
    /// clears the input. A response arriving after the next request has been sent is taken
    /// as the response of that request.
    pub fn write_only(&self, payload: &str) -> Result<(), Error> {
        let mut state = self.state.lock();
        let result = state.send(payload);
        state.report(&self.name, payload, &result);
        result
    }
}

/// Parses an integer value the way the controller formats it.
fn parse_value(data: &str) -> Result<i32, Error> {
    data.trim().parse::<i32>().map_err(|_| {
        ProtocolError::UnexpectedData {
            data: data.to_string(),
        }
        .into()
    })
}

/// Truncates `text` to at most `max` bytes (on a char boundary).
fn bounded(text: &str, max: usize) -> String {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

impl Display for PhytronIo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "PhytronIo({}) [card={}, transport={}, status={}]",
            self.name,
            self.card,
            state.transport,
            state.policy.last()
        )
    }
}

impl IoController for PhytronIo {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_card(&self) -> u8 {
        self.card
    }

    /// # Errors
    /// * `HardwareError`: invalid address or parameter not readable.
    /// * `NotAcknowledged`: the controller rejected the command.
    /// * `UnexpectedData`: the response is not an integer.
    /// * any [`PhytronIo::execute`] error.
    fn read(&self, parameter: Parameter, channel: u8) -> Result<i32, Error> {
        let mut state = self.state.lock();
        let result = read_command(parameter, self.card, channel).and_then(|command| {
            let reply = state.transact(&command)?;
            match reply.is_ack() {
                true => parse_value(&reply.data),
                false => Err(ProtocolError::NotAcknowledged { command }.into()),
            }
        });
        state.report(&self.name, parameter.as_str(), &result);
        if let Ok(value) = &result {
            debug!(
                "{}: card {}.{} {} read: {}",
                self.name, self.card, channel, parameter, value
            );
        }
        result
    }

    /// Sent with [`PhytronIo::write_only`]: the acknowledgement is never read, so a rejected
    /// write is not reported.
    ///
    /// # Errors
    /// * `HardwareError`: invalid address or parameter not writable.
    /// * any transport error.
    fn write(&self, parameter: Parameter, channel: u8, value: i32) -> Result<(), Error> {
        let mut state = self.state.lock();
        let result = write_command(parameter, self.card, channel, value)
            .and_then(|command| {
                debug!(
                    "{}: card {}.{} {} cmd: '{}'",
                    self.name, self.card, channel, parameter, command
                );
                state.send(&command)
            });
        state.report(&self.name, parameter.as_str(), &result);
        result
    }

    fn command(&self, command: &str) -> Result<String, Error> {
        let mut state = self.state.lock();
        let result = state
            .transact(command)
            .map(|reply| bounded(reply.text(), MAX_PAYLOAD_SIZE));
        if let Ok(response) = &result {
            debug!("{}: write: '{}'\t response: {}", self.name, command, response);
            state.last_response = response.clone();
        }
        state.report(&self.name, command, &result);
        result
    }

    fn last_response(&self) -> String {
        self.state.lock().last_response.clone()
    }

    fn last_status(&self) -> Status {
        self.state.lock().policy.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HardwareError;
    use crate::io::frame::Acknowledge;
    use crate::mocks::transport::MockTransport;
    use serial_test::serial;
    use std::io::ErrorKind;
    use std::thread;

    fn controller(card: u8) -> (PhytronIo, MockTransport) {
        let transport = MockTransport::default().connected();
        (PhytronIo::new("IO1", card, transport.clone()), transport)
    }

    #[test]
    fn test_new_controller() {
        let (controller, _) = controller(2);
        assert_eq!(controller.get_name(), "IO1");
        assert_eq!(controller.get_card(), 2);
        assert_eq!(controller.get_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(controller.last_status(), Status::Success);
        assert_eq!(controller.last_response(), "");
        assert_eq!(
            controller.to_string(),
            "PhytronIo(IO1) [card=2, transport=MockTransport, status=Success]"
        );
    }

    #[test]
    fn test_open_close() {
        let transport = MockTransport::default();
        let controller =
            PhytronIo::new("IO1", 1, transport.clone()).with_timeout(Duration::from_millis(300));
        assert!(!controller.is_connected());
        controller.open().unwrap();
        assert!(controller.is_connected());
        assert_eq!(transport.get_timeout(), Duration::from_millis(300));
        controller.close().unwrap();
        assert!(!controller.is_connected());
    }

    #[test]
    fn test_open_failure() {
        let transport = MockTransport::default();
        transport.fail_open(ErrorKind::NotFound);
        let controller = PhytronIo::new("IO1", 1, transport);
        let error = controller.open().unwrap_err();
        assert_eq!(error.status(), Status::Disconnected);
        assert!(!controller.is_connected());
    }

    #[test]
    fn test_set_timeout() {
        let (controller, transport) = controller(1);
        controller.set_timeout(Duration::from_millis(50)).unwrap();
        assert_eq!(controller.get_timeout(), Duration::from_millis(50));
        assert_eq!(transport.get_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn test_execute_data() {
        let (controller, transport) = controller(1);
        transport.reply("AIODE4");

        let reply = controller.execute("IM1").unwrap();
        assert_eq!(reply.acknowledge, Acknowledge::Ack);
        assert_eq!(reply.data, "AIODE4");
        assert_eq!(transport.written(), vec![b"\x02\x30IM1:XX\x03".to_vec()]);
    }

    #[test]
    fn test_execute_bare_ack() {
        let (controller, transport) = controller(1);
        transport.ack();
        let reply = controller.execute("A1.1S").unwrap();
        assert!(reply.is_ack());
        assert_eq!(reply.text(), "ACK");
    }

    #[test]
    fn test_execute_nak_is_not_an_error() {
        let (controller, transport) = controller(1);
        transport.nak();
        let reply = controller.execute("XYZ").unwrap();
        assert!(!reply.is_ack());
        assert_eq!(reply.text(), "NACK");
        assert_eq!(controller.last_status(), Status::Success);
    }

    #[test]
    fn test_execute_malformed() {
        let (controller, transport) = controller(1);
        transport.frame(b"\x06AIODE4:XX\x03");
        let error = controller.execute("IM1").unwrap_err();
        assert_eq!(error.status(), Status::ProtocolError);
        assert_eq!(controller.last_status(), Status::ProtocolError);
    }

    #[test]
    fn test_execute_overflow_sends_nothing() {
        let (controller, transport) = controller(1);
        let payload = "A".repeat(MAX_PAYLOAD_SIZE + 1);
        let error = controller.execute(&payload).unwrap_err();
        assert_eq!(error.status(), Status::Overflow);
        assert!(transport.written().is_empty());

        // The largest payload still goes through.
        transport.ack();
        let payload = "A".repeat(MAX_PAYLOAD_SIZE);
        assert!(controller.execute(&payload).is_ok());
        assert_eq!(transport.written()[0].len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_execute_timeout() {
        let (controller, _) = controller(1);
        let error = controller.execute("IM1").unwrap_err();
        assert_eq!(error.status(), Status::Timeout);
        assert_eq!(controller.last_status(), Status::Timeout);
    }

    #[test]
    fn test_execute_disconnected() {
        let (controller, transport) = controller(1);
        transport.failure(ErrorKind::BrokenPipe);
        let error = controller.execute("IM1").unwrap_err();
        assert_eq!(error.status(), Status::Disconnected);

        let controller = PhytronIo::new("IO2", 1, MockTransport::default());
        let error = controller.execute("IM1").unwrap_err();
        assert_eq!(error.status(), Status::Disconnected);
    }

    #[test]
    fn test_echo() {
        let (controller, transport) = controller(1);
        transport.echo();
        assert_eq!(controller.command("HELLO").unwrap(), "HELLO");
        assert_eq!(controller.command("IM3").unwrap(), "IM3");
    }

    #[test]
    fn test_echo_every_payload_length() {
        let (controller, transport) = controller(1);
        transport.echo();
        let alphabet: Vec<char> = ('A'..='Z').chain('0'..='9').chain(['.', '=', ' ']).collect();

        for length in 0..=MAX_PAYLOAD_SIZE {
            let payload: String = (0..length).map(|i| alphabet[i % alphabet.len()]).collect();
            let reply = controller.execute(&payload).unwrap();
            assert!(reply.is_ack());
            assert_eq!(reply.data, payload, "payload of {} bytes", length);
        }
        assert_eq!(transport.written().len(), MAX_PAYLOAD_SIZE + 1);
        assert_eq!(
            transport.written().last().map(Vec::len),
            Some(MAX_FRAME_SIZE)
        );
    }

    #[test]
    fn test_configure_keeps_inner_empty_command() {
        let (controller, transport) = controller(1);
        transport.ack().nak().ack();

        let outcomes = controller.configure("IM1;;IM2");
        assert_eq!(outcomes.len(), 3);
        assert_eq!(transport.commands(), vec!["IM1", "", "IM2"]);
        assert_eq!(outcomes[1].response, "NACK");
        assert_eq!(outcomes[2].response, "ACK");
    }

    #[test]
    fn test_read_mnemonics() {
        let (controller, transport) = controller(2);
        transport.reply("1").reply("42").reply(" 255 ").reply("0");

        assert_eq!(controller.read(Parameter::DigitalIn, 3).unwrap(), 1);
        assert_eq!(controller.read(Parameter::AnalogIn, 4).unwrap(), 42);
        assert_eq!(controller.read(Parameter::DigitalIn, 0).unwrap(), 255);
        assert_eq!(controller.read(Parameter::DigitalOut, 1).unwrap(), 0);
        assert_eq!(transport.commands(), vec!["EZ2.3", "AD2.4", "EG2R", "AZ2.1"]);
    }

    #[test]
    fn test_read_failures() {
        let (controller, transport) = controller(2);

        transport.nak();
        let error = controller.read(Parameter::DigitalIn, 1).unwrap_err();
        assert_eq!(error.status(), Status::ProtocolError);
        assert!(error.to_string().contains("EZ2.1"));

        transport.reply("ON");
        let error = controller.read(Parameter::DigitalIn, 1).unwrap_err();
        assert_eq!(error.status(), Status::ProtocolError);

        // Invalid addresses never reach the transport.
        let written = transport.written().len();
        let error = controller.read(Parameter::DigitalIn, 9).unwrap_err();
        assert!(matches!(
            error,
            Error::HardwareError {
                source: HardwareError::InvalidChannel { .. }
            }
        ));
        assert!(controller.read(Parameter::Command, 1).is_err());
        assert_eq!(transport.written().len(), written);
    }

    #[test]
    fn test_write_mnemonics() {
        let (controller, transport) = controller(2);
        controller.write(Parameter::DigitalOut, 0, 1).unwrap();
        controller.write(Parameter::DigitalOut, 0, 0).unwrap();
        controller.write(Parameter::DigitalOut, 3, 1).unwrap();
        controller.write(Parameter::DigitalOut, 3, 0).unwrap();
        controller.write(Parameter::AnalogOut, 1, 512).unwrap();
        assert_eq!(
            transport.commands(),
            vec!["AG2S1", "AG2R", "A2.3S", "A2.3R", "DA2.1=512"]
        );
        assert!(controller.write(Parameter::DigitalIn, 1, 1).is_err());
    }

    #[test]
    fn test_write_does_not_read_response() {
        let (controller, transport) = controller(2);
        transport.nak();

        // The rejection stays pending: the write neither waits for it nor reports it.
        controller.write(Parameter::DigitalOut, 1, 1).unwrap();
        assert_eq!(transport.commands(), vec!["A2.1S"]);
        assert_eq!(controller.last_status(), Status::Success);

        // A response still pending when the next request goes out is taken as its own.
        controller.write(Parameter::DigitalOut, 1, 0).unwrap();
        assert_eq!(controller.command("IM2").unwrap(), "NACK");
    }

    #[test]
    fn test_command_last_response() {
        let (controller, transport) = controller(1);
        transport.reply("AIODE4").nak();

        assert_eq!(controller.command("IM1").unwrap(), "AIODE4");
        assert_eq!(controller.last_response(), "AIODE4");
        assert_eq!(controller.command("XX").unwrap(), "NACK");
        assert_eq!(controller.last_response(), "NACK");

        // A failed command keeps the previous response.
        assert!(controller.command("IM1").is_err());
        assert_eq!(controller.last_response(), "NACK");
    }

    #[test]
    fn test_status_transitions() {
        let (controller, transport) = controller(1);
        transport.ack();
        assert!(controller.command("IM1").is_ok());
        assert_eq!(controller.last_status(), Status::Success);

        assert!(controller.command("IM1").is_err());
        assert!(controller.command("IM1").is_err());
        assert_eq!(controller.last_status(), Status::Timeout);

        transport.ack();
        assert!(controller.command("IM1").is_ok());
        assert_eq!(controller.last_status(), Status::Success);
    }

    #[test]
    fn test_clones_share_state() {
        let (controller, transport) = controller(1);
        let clone = controller.clone();
        transport.reply("AIODE4");
        clone.command("IM1").unwrap();
        assert_eq!(controller.last_response(), "AIODE4");
    }

    #[test]
    #[serial]
    fn test_transactions_never_overlap() {
        let (controller, transport) = controller(1);
        transport.echo().latency(Duration::from_millis(5));

        let handles: Vec<_> = (0..4)
            .map(|index| {
                let controller = controller.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        let command = format!("T{}", index);
                        assert_eq!(controller.command(&command).unwrap(), command);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(transport.written().len(), 20);
        assert_eq!(transport.overlaps(), 0);
    }

    #[test]
    fn test_bounded() {
        assert_eq!(bounded("abc", 2), "ab");
        assert_eq!(bounded("abc", 5), "abc");
        assert_eq!(bounded("aé", 2), "a");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("12").unwrap(), 12);
        assert_eq!(parse_value(" -3\r").unwrap(), -3);
        assert!(parse_value("").is_err());
    }
}
