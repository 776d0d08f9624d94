//! Operator entry points: one-off raw commands and installed cards enumeration.
//!
//! Everything here goes through the raw command primitive of [`IoController`].

use std::fmt::{Display, Formatter};

use log::debug;

use crate::errors::{Error, ProtocolError};
use crate::io::{identify_command, IoController, Status, MAX_CARDS};
use crate::registry::Registry;

/// Sends one raw `command` to the controller registered as `port`.
///
/// # Errors
/// * `UnknownPort`: no such controller.
/// * `EmptyCommand`: nothing to send.
/// * any transaction error.
pub fn command(registry: &Registry, port: &str, command: &str) -> Result<String, Error> {
    let controller = registry.get(port)?;
    let command = command.trim();
    if command.is_empty() {
        return Err(ProtocolError::EmptyCommand.into());
    }
    controller.command(command)
}

/// Enumerates the cards installed in the rack of the controller registered as `port`.
pub fn report(registry: &Registry, port: &str) -> Result<CardReport, Error> {
    let controller = registry.get(port)?;
    Ok(enumerate_cards(controller.as_ref()))
}

/// Identifies the card of every slot (`IM1` to `IM16`).
///
/// A failing slot does not stop the enumeration.
pub fn enumerate_cards<C: IoController + ?Sized>(controller: &C) -> CardReport {
    let slots = (1..=MAX_CARDS)
        .map(|slot| {
            let card = controller.command(&identify_command(slot)).map_err(|err| {
                debug!("{}: slot {} not identified: {}", controller.get_name(), slot, err);
                err.status()
            });
            SlotEntry { slot, card }
        })
        .collect();
    CardReport { slots }
}

/// Identification result of one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotEntry {
    pub slot: u8,
    /// Card type as answered by the controller, or the failure status.
    pub card: Result<String, Status>,
}

/// Cards installed in a phyMOTION rack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardReport {
    pub slots: Vec<SlotEntry>,
}

impl CardReport {
    /// Slots which answered with a card type.
    pub fn installed(&self) -> impl Iterator<Item = (u8, &str)> {
        self.slots
            .iter()
            .filter_map(|entry| entry.card.as_deref().ok().map(|card| (entry.slot, card)))
    }
}

impl Display for CardReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "phyMotion Device")?;
        writeln!(f, "slot nr\t| card type:")?;
        for entry in &self.slots {
            match &entry.card {
                Ok(card) => writeln!(f, "  {}\t| {}", entry.slot, card)?,
                Err(status) => writeln!(f, "  {}\t| ERROR status: '{}'", entry.slot, status)?,
            }
        }
        Ok(())
    }
}
