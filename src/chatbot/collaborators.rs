//! Optional page collaborators: the booking popup, the audio cue and the clock.

use chrono::{DateTime, Utc};
use std::io::Write;

/// The host page's booking popup. Both hooks default to doing nothing.
pub trait BookingPopup {
    fn open(&mut self) {}
    fn close(&mut self) {}
}

/// A page without a booking popup.
pub struct NoPopup;

impl BookingPopup for NoPopup {}

/// Sound played when an assistant message arrives.
pub trait AudioCue {
    fn play(&mut self) -> Result<(), String>;
}

pub struct Silent;

impl AudioCue for Silent {
    fn play(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play(&mut self) -> Result<(), String> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|e| format!("Failed to ring bell: {e}"))
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
