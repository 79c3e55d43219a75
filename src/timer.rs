//! Per-question countdown
//!
//! The countdown does not own a clock. The run schedules one tick alarm
//! per second and feeds each one back through [`Countdown::tick`]; the
//! countdown only decides what a tick means. Once cancelled or expired,
//! every further tick is ignored, so a tick that was already scheduled
//! when the question was revealed can never fire an expiry.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::constants::timing;

/// What a delivered tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown moved down and is still running
    Running(u64),
    /// The countdown just reached zero, reported exactly once
    Expired,
    /// The countdown was not running, nothing changed
    Ignored,
}

/// A whole-second countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    duration: u64,
    remaining: u64,
    running: bool,
}

impl Countdown {
    /// Interval between two ticks
    pub const TICK: Duration = Duration::from_millis(timing::TICK_INTERVAL);

    /// Creates a stopped countdown of `duration` seconds
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            remaining: duration,
            running: false,
        }
    }

    /// Starts (or restarts) the countdown from its full duration
    ///
    /// A zero-length countdown expires immediately.
    pub fn start(&mut self) -> Tick {
        self.remaining = self.duration;
        if self.duration == 0 {
            self.running = false;
            Tick::Expired
        } else {
            self.running = true;
            Tick::Running(self.remaining)
        }
    }

    /// Applies one elapsed second
    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Ignored;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.running = false;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Stops the countdown, freezing the remaining time
    pub fn cancel(&mut self) {
        self.running = false;
    }

    /// Seconds left on the clock
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Full duration in seconds
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Whether ticks are still being counted
    pub fn is_running(&self) -> bool {
        self.running
    }
}
