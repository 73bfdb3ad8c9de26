use crate::event::{Event, Level, MSG_EVENT_HEARTBEAT, MSG_EVENT_PROBE, MSG_MEATBAG_ACTIVATED, MSG_MEATBAG_DEACTIVATED};

#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Byte is not part of the event vocabulary.
    UnknownCode(u8),
    /// A sample bit arrived without a preceding probe code.
    UnexpectedSample(u8),
    /// A probe code was followed by something other than `0` or `1`.
    InvalidProbeValue(u8),
    /// The stream ended between a probe code and its sample.
    TruncatedProbe,
}

/// Splits the undelimited digit stream back into events, one byte at a time.
#[derive(Debug, Default)]
pub struct Decoder {
    probe_pending: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Result<Option<Event>, DecodeError> {
        if self.probe_pending {
            self.probe_pending = false;
            return match byte {
                b'0' => Ok(Some(Event::Probe(Level::Low))),
                b'1' => Ok(Some(Event::Probe(Level::High))),
                other => {
                    warn!("Decode> probe followed by {:02X}", other);
                    Err(DecodeError::InvalidProbeValue(other))
                }
            };
        }

        match byte.wrapping_sub(b'0') {
            0 | 1 => Err(DecodeError::UnexpectedSample(byte)),
            MSG_MEATBAG_DEACTIVATED => Ok(Some(Event::Deactivate)),
            MSG_MEATBAG_ACTIVATED => Ok(Some(Event::Activate)),
            MSG_EVENT_HEARTBEAT => Ok(Some(Event::Heartbeat)),
            MSG_EVENT_PROBE => {
                self.probe_pending = true;
                Ok(None)
            }
            _ => Err(DecodeError::UnknownCode(byte)),
        }
    }

    /// Checks that the stream did not stop in the middle of a probe.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if core::mem::take(&mut self.probe_pending) {
            Err(DecodeError::TruncatedProbe)
        } else {
            Ok(())
        }
    }
}
