//! Tick-rate limiting.
//!
//! [`TickTimer`] gates the expensive logic of a device to one run per
//! interval; [`Countdown`] is a plain per-tick countdown used for transfer
//! delays and shutter timers.

use serde::{Deserialize, Serialize};

/// Gate that lets the device logic run once its countdown is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTimer {
    remaining: u32,
}

impl TickTimer {
    /// Timer that runs after `remaining` idle calls.
    pub fn new(remaining: u32) -> Self {
        Self { remaining }
    }

    /// Idle calls left before the next run.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Called once per game tick. Returns `true` when the logic should run,
    /// in which case the timer restarts at `interval`.
    pub fn poll(&mut self, interval: u32) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            return false;
        }
        self.remaining = interval;
        true
    }

    /// Bring the next run forward to at most `ticks` idle calls away.
    pub fn shorten_to(&mut self, ticks: u32) {
        self.remaining = self.remaining.min(ticks);
    }
}

/// Countdown decremented on every game tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    /// Countdown starting at `remaining`.
    pub fn new(remaining: u32) -> Self {
        Self { remaining }
    }

    /// Ticks left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether the countdown has run out.
    pub fn is_ready(&self) -> bool {
        self.remaining == 0
    }

    /// Restart at `ticks`.
    pub fn set(&mut self, ticks: u32) {
        self.remaining = ticks;
    }

    /// Clamp the countdown to at most `ticks`.
    pub fn cap(&mut self, ticks: u32) {
        self.remaining = self.remaining.min(ticks);
    }

    /// Decrement by one. Returns `true` if the countdown just reached zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    /// Count `ticks` down; once they cover what is left, restart at `period`
    /// and return `true`.
    pub fn restart_if_due(&mut self, ticks: u32, period: u32) -> bool {
        if self.remaining <= ticks {
            self.remaining = period;
            return true;
        }
        self.remaining -= ticks;
        false
    }
}
