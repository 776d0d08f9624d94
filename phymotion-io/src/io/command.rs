//! Translation of channel accesses into phyMOTION command mnemonics.
//!
//! Cards, channels and bits are addressed from 1. For digital cards, channel 0 addresses
//! all bits of the port at once.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{Error, HardwareError, ProtocolError};

/// Number of slots in a phyMOTION rack.
pub const MAX_CARDS: u8 = 16;
/// Highest channel address of a card (0 is the whole digital port).
pub const MAX_CHANNEL: u8 = 8;

/// Lists the parameters a host framework can bind to a controller.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Digital input (`DIN`).
    DigitalIn,
    /// Analog input (`AIN`).
    AnalogIn,
    /// Digital output (`DOUT`).
    DigitalOut,
    /// Analog output (`AOUT`).
    AnalogOut,
    /// Raw command (`CMD`).
    Command,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::DigitalIn,
        Parameter::AnalogIn,
        Parameter::DigitalOut,
        Parameter::AnalogOut,
        Parameter::Command,
    ];

    /// Name of the parameter as known by host frameworks.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::DigitalIn => "DIN",
            Parameter::AnalogIn => "AIN",
            Parameter::DigitalOut => "DOUT",
            Parameter::AnalogOut => "AOUT",
            Parameter::Command => "CMD",
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|parameter| parameter.as_str() == s)
            .ok_or_else(|| {
                ProtocolError::UnexpectedData {
                    data: s.to_string(),
                }
                .into()
            })
    }
}

/// Checks `card` is a valid slot number.
pub fn check_card(card: u8) -> Result<(), Error> {
    match card {
        1..=MAX_CARDS => Ok(()),
        card => Err(HardwareError::InvalidCard {
            card,
            max: MAX_CARDS,
        }
        .into()),
    }
}

fn validate(card: u8, channel: u8) -> Result<(), Error> {
    check_card(card)?;
    if channel > MAX_CHANNEL {
        return Err(HardwareError::InvalidChannel {
            channel,
            context: "channel out of range",
        }
        .into());
    }
    Ok(())
}

fn analog_channel(channel: u8) -> Result<u8, Error> {
    match channel {
        0 => Err(HardwareError::InvalidChannel {
            channel,
            context: "analog channels start at 1",
        }
        .into()),
        channel => Ok(channel),
    }
}

/// Builds the mnemonic reading `parameter` on `card`, `channel`.
///
/// | Parameter    | channel 0 | channel N |
/// |--------------|-----------|-----------|
/// | `DigitalIn`  | `EG{C}R`  | `EZ{C}.{N}` |
/// | `DigitalOut` | `AG{C}R`  | `AZ{C}.{N}` |
/// | `AnalogIn`   | -         | `AD{C}.{N}` |
/// | `AnalogOut`  | -         | `DA{C}.{N}` |
///
/// # Errors
/// * `InvalidCard`, `InvalidChannel`: the address is out of range.
/// * `UnsupportedOperation`: raw commands have no typed read.
pub fn read_command(parameter: Parameter, card: u8, channel: u8) -> Result<String, Error> {
    validate(card, channel)?;
    match parameter {
        Parameter::DigitalIn if channel == 0 => Ok(format!("EG{}R", card)),
        Parameter::DigitalIn => Ok(format!("EZ{}.{}", card, channel)),
        Parameter::DigitalOut if channel == 0 => Ok(format!("AG{}R", card)),
        Parameter::DigitalOut => Ok(format!("AZ{}.{}", card, channel)),
        Parameter::AnalogIn => Ok(format!("AD{}.{}", card, analog_channel(channel)?)),
        Parameter::AnalogOut => Ok(format!("DA{}.{}", card, analog_channel(channel)?)),
        Parameter::Command => Err(HardwareError::UnsupportedOperation {
            parameter,
            operation: "typed read",
        }
        .into()),
    }
}

/// Builds the mnemonic writing `value` to `parameter` on `card`, `channel`.
///
/// Writing 0 to the whole digital port uses `AG{C}R`, the same mnemonic as the port
/// readback: this overload is defined by the controller command set.
///
/// # Errors
/// * `InvalidCard`, `InvalidChannel`: the address is out of range.
/// * `UnsupportedOperation`: inputs and raw commands cannot be written.
pub fn write_command(
    parameter: Parameter,
    card: u8,
    channel: u8,
    value: i32,
) -> Result<String, Error> {
    validate(card, channel)?;
    match parameter {
        Parameter::DigitalOut if channel == 0 => match value {
            0 => Ok(format!("AG{}R", card)),
            value => Ok(format!("AG{}S{}", card, value)),
        },
        Parameter::DigitalOut => {
            let action = if value != 0 { 'S' } else { 'R' };
            Ok(format!("A{}.{}{}", card, channel, action))
        }
        Parameter::AnalogOut => Ok(format!("DA{}.{}={}", card, analog_channel(channel)?, value)),
        _ => Err(HardwareError::UnsupportedOperation {
            parameter,
            operation: "typed write",
        }
        .into()),
    }
}

/// Builds the mnemonic identifying the card installed in `slot`.
pub fn identify_command(slot: u8) -> String {
    format!("IM{}", slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Status;

    #[test]
    fn test_parameter_names() {
        for parameter in Parameter::ALL {
            assert_eq!(parameter.as_str().parse::<Parameter>().unwrap(), parameter);
        }
        assert_eq!("AOUT".parse::<Parameter>().unwrap(), Parameter::AnalogOut);
        assert_eq!(format!("{}", Parameter::DigitalIn), "DIN");
        assert!("FOO".parse::<Parameter>().is_err());
        assert!("din".parse::<Parameter>().is_err());
    }

    #[test]
    fn test_read_digital() {
        assert_eq!(read_command(Parameter::DigitalIn, 2, 0).unwrap(), "EG2R");
        assert_eq!(read_command(Parameter::DigitalIn, 2, 3).unwrap(), "EZ2.3");
        assert_eq!(read_command(Parameter::DigitalOut, 1, 0).unwrap(), "AG1R");
        assert_eq!(read_command(Parameter::DigitalOut, 1, 8).unwrap(), "AZ1.8");
    }

    #[test]
    fn test_read_analog() {
        assert_eq!(read_command(Parameter::AnalogIn, 1, 4).unwrap(), "AD1.4");
        assert_eq!(read_command(Parameter::AnalogOut, 3, 2).unwrap(), "DA3.2");
        assert!(read_command(Parameter::AnalogIn, 1, 0).is_err());
        assert!(read_command(Parameter::AnalogOut, 1, 0).is_err());
    }

    #[test]
    fn test_read_unsupported() {
        let error = read_command(Parameter::Command, 1, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Hardware error: Parameter (CMD) does not support typed read."
        );
    }

    #[test]
    fn test_write_digital() {
        assert_eq!(write_command(Parameter::DigitalOut, 2, 0, 1).unwrap(), "AG2S1");
        assert_eq!(write_command(Parameter::DigitalOut, 2, 0, 255).unwrap(), "AG2S255");
        assert_eq!(write_command(Parameter::DigitalOut, 2, 3, 0).unwrap(), "A2.3R");
        assert_eq!(write_command(Parameter::DigitalOut, 2, 3, 1).unwrap(), "A2.3S");
        assert_eq!(write_command(Parameter::DigitalOut, 2, 3, -4).unwrap(), "A2.3S");
    }

    #[test]
    fn test_write_port_zero_matches_readback() {
        // The controller command set uses the same mnemonic for both.
        let write = write_command(Parameter::DigitalOut, 4, 0, 0).unwrap();
        assert_eq!(write, "AG4R");
        assert_eq!(write, read_command(Parameter::DigitalOut, 4, 0).unwrap());
    }

    #[test]
    fn test_write_analog() {
        assert_eq!(write_command(Parameter::AnalogOut, 1, 2, 5000).unwrap(), "DA1.2=5000");
        assert_eq!(write_command(Parameter::AnalogOut, 1, 2, -10).unwrap(), "DA1.2=-10");
        assert!(write_command(Parameter::AnalogOut, 1, 0, 10).is_err());
    }

    #[test]
    fn test_write_unsupported() {
        for parameter in [Parameter::DigitalIn, Parameter::AnalogIn, Parameter::Command] {
            assert!(write_command(parameter, 1, 1, 1).is_err());
        }
    }

    #[test]
    fn test_address_validation() {
        let error = read_command(Parameter::DigitalIn, 0, 1).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Hardware error: Invalid card number 0, must be in range 1 to 16."
        );
        assert!(read_command(Parameter::DigitalIn, MAX_CARDS + 1, 1).is_err());
        assert!(read_command(Parameter::DigitalIn, MAX_CARDS, 1).is_ok());

        let error = write_command(Parameter::DigitalOut, 1, MAX_CHANNEL + 1, 1).unwrap_err();
        assert_eq!(error.status(), Status::ProtocolError);
    }

    #[test]
    fn test_identify() {
        assert_eq!(identify_command(1), "IM1");
        assert_eq!(identify_command(16), "IM16");
    }
}
