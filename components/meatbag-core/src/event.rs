//! Events reported to the host and their serial representation.
//!
//! The host link carries bare ASCII digits with no framing: every event is a
//! single code digit, and a probe is additionally followed by the sampled bit.
//! [`Event::encode`] is the only place that produces this format.

use heapless::Vec;

pub const MSG_MEATBAG_DEACTIVATED: u8 = 2;
pub const MSG_MEATBAG_ACTIVATED: u8 = 3;
pub const MSG_EVENT_HEARTBEAT: u8 = 4;
pub const MSG_EVENT_PROBE: u8 = 5;

/// Longest encoded event (probe code + sample).
pub const MAX_ENCODED_LEN: usize = 2;

/// Digital level of an input pin, also the bit carried by a probe.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The operator released the activation switch.
    Deactivate,
    /// The operator engaged the activation switch.
    Activate,
    /// Half-cycle tick, lets the host draw the signal edge.
    Heartbeat,
    /// Half-cycle sample of the meatbag signal pin.
    Probe(Level),
}

impl Event {
    pub fn code(&self) -> u8 {
        match self {
            Event::Deactivate => MSG_MEATBAG_DEACTIVATED,
            Event::Activate => MSG_MEATBAG_ACTIVATED,
            Event::Heartbeat => MSG_EVENT_HEARTBEAT,
            Event::Probe(_) => MSG_EVENT_PROBE,
        }
    }

    pub fn encode(&self) -> Vec<u8, MAX_ENCODED_LEN> {
        let mut bytes = Vec::new();
        // capacity covers the longest event, pushes cannot fail
        let _ = bytes.push(b'0' + self.code());
        if let Event::Probe(level) = self {
            let _ = bytes.push(b'0' + level.bit());
        }
        bytes
    }
}
