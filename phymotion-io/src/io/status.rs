use std::fmt::{Display, Formatter};

/// Outcome of a transaction with the controller.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Success,
    /// No response within the configured timeout.
    Timeout,
    /// Payload or response too large to fit in a frame.
    Overflow,
    /// Malformed or unexpected frame.
    ProtocolError,
    /// Transport connection failure.
    Disconnected,
    /// Reserved: never produced by the engine itself.
    Disabled,
}

impl Status {
    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Status::Success => "Success",
            Status::Timeout => "Timeout",
            Status::Overflow => "Overflow",
            Status::ProtocolError => "ProtocolError",
            Status::Disconnected => "Disconnected",
            Status::Disabled => "Disabled",
        };
        write!(f, "{}", status)
    }
}

/// Remembers the last reported status so that a continuously failing channel is only
/// reported once, and its recovery once.
///
/// The policy only decides whether to produce a report: it never alters the status
/// returned to callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusPolicy {
    last: Status,
}

impl StatusPolicy {
    /// Records `current` and indicates whether it differs from the previous status.
    pub fn report(&mut self, current: Status) -> bool {
        let changed = current != self.last;
        self.last = current;
        changed
    }

    pub fn last(&self) -> Status {
        self.last
    }
}
