//! Framing of the phyMOTION serial protocol.
//!
//! ```text
//! Request:  <STX><ADDR>command:XX<ETX>
//! Response: <STX><ACK>data:CS<ETX>  or  <STX><ACK><ETX>  or  <STX><NAK><ETX>
//! ```
//!
//! STX=0x02, ADDR=0x30, ACK=0x06 / NAK=0x15, ':'=separator, CS=checksum or `XX` to
//! ignore the checksum, ETX=0x03. Checksums are never computed nor verified.

use std::fmt::{Display, Formatter};

use log::trace;

use crate::errors::{Error, ProtocolError};
use crate::utils::to_hex;

/// Start of frame marker.
pub const STX: u8 = 0x02;
/// End of frame marker.
pub const ETX: u8 = 0x03;
/// Fixed address byte of every request.
pub const ADDRESS: u8 = 0x30;
/// Positive acknowledgement.
pub const ACK: u8 = 0x06;
/// Negative acknowledgement.
pub const NAK: u8 = 0x15;
/// Separates the payload from the checksum.
pub const SEPARATOR: u8 = b':';
/// Checksum placeholder telling the controller to skip verification.
pub const SKIP_CHECKSUM: &[u8] = b"XX";

/// Maximum length of a command (or response data) text.
pub const MAX_PAYLOAD_SIZE: usize = 255;
/// Bytes added around the payload: STX, ADDR, ':', 'X', 'X', ETX.
pub const FRAME_OVERHEAD: usize = 6;
/// Maximum size of a complete frame on the wire.
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// Acknowledgement code carried by a response frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acknowledge {
    /// The controller accepted the command (0x06).
    Ack,
    /// The controller rejected the command: holds the received code (0x15 normally).
    Nak(u8),
}

impl From<u8> for Acknowledge {
    fn from(code: u8) -> Self {
        match code {
            ACK => Acknowledge::Ack,
            other => Acknowledge::Nak(other),
        }
    }
}

/// A decoded response frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub acknowledge: Acknowledge,
    /// Response data (empty for a bare acknowledgement or a NAK).
    pub data: String,
}

impl Reply {
    pub fn is_ack(&self) -> bool {
        self.acknowledge == Acknowledge::Ack
    }

    /// Textual form of the reply, as shown to operators: the data if any, `ACK` for an
    /// empty acknowledgement, `NACK` when the command was rejected.
    pub fn text(&self) -> &str {
        match self.acknowledge {
            Acknowledge::Ack if self.data.is_empty() => "ACK",
            Acknowledge::Ack => &self.data,
            Acknowledge::Nak(_) => "NACK",
        }
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Builds the request frame for `payload`.
///
/// # Errors
/// * `Overflow`: the payload is longer than [`MAX_PAYLOAD_SIZE`].
pub fn encode(payload: &str) -> Result<Vec<u8>, Error> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::Overflow {
            length: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    frame.push(STX);
    frame.push(ADDRESS);
    frame.extend_from_slice(payload.as_bytes());
    frame.push(SEPARATOR);
    frame.extend_from_slice(SKIP_CHECKSUM);
    frame.push(ETX);
    Ok(frame)
}

/// Parses a response frame.
///
/// The frame must start with STX and end with ETX. On a positive acknowledgement, the
/// data is the text between the ACK byte and the first separator; without a separator
/// the reply is a bare acknowledgement. Whatever follows the separator is discarded.
///
/// # Errors
/// * `MessageTooShort`: less than 3 bytes received.
/// * `MalformedFrame`: the start or end marker is missing.
/// * `UnexpectedData`: the data is not valid text.
pub fn decode(bytes: &[u8]) -> Result<Reply, Error> {
    if bytes.len() < 3 {
        return Err(ProtocolError::MessageTooShort {
            expected: 3,
            received: bytes.len(),
        }
        .into());
    }
    if bytes[0] != STX || bytes[bytes.len() - 1] != ETX {
        return Err(ProtocolError::MalformedFrame {
            frame: to_hex(bytes),
        }
        .into());
    }

    let acknowledge = Acknowledge::from(bytes[1]);
    let body = &bytes[2..bytes.len() - 1];
    let data = match acknowledge {
        Acknowledge::Ack => match body.iter().position(|&b| b == SEPARATOR) {
            Some(separator) => std::str::from_utf8(&body[..separator])?.to_string(),
            None => String::new(),
        },
        Acknowledge::Nak(code) => {
            trace!("Negative acknowledge received: x{:02X}", code);
            String::new()
        }
    };

    Ok(Reply { acknowledge, data })
}
