#![cfg_attr(not(test), no_std)]

// must stay first so the logging macros are visible to the modules below
mod fmt;

pub mod bits;
pub mod decode;
pub mod event;
pub mod runner;
pub mod transcriber;

pub mod config {
    /// Rate at which the operator is asked to transcribe bits, in cycles per second.
    pub const BAUD: u32 = 4;
    /// One full heartbeat + probe cycle.
    pub const CYCLE_TIMESPAN: u32 = 1000 / BAUD;
    /// Half a cycle: the minimum spacing between two consecutive events.
    pub const EVENT_TIMESPAN: u32 = CYCLE_TIMESPAN / 2;
    /// Bit rate of the serial link towards the host.
    pub const SERIAL_BAUDRATE: u32 = 9600;
}
