//! Per-client request throttle
//!
//! Each client address gets a fixed window. The first request after the
//! window elapsed opens a new one and counts as its first request; every
//! request inside the window, allowed or not, increments the count.

use std::collections::HashMap;

use garde::Validate;
use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use crate::constants::throttle;

/// Throttle settings
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Options {
    /// Requests allowed per window
    #[garde(range(min = 1))]
    pub limit: u32,
    /// Length of a window
    #[garde(skip)]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub window: Duration,
}

impl Default for Options {
    /// Three requests per minute
    fn default() -> Self {
        Self {
            limit: throttle::LIMIT,
            window: Duration::from_millis(throttle::WINDOW),
        }
    }
}

/// Verdict on a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window ends
    pub reset: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    last_reset: Instant,
}

/// Counts requests per client address
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    options: Options,
    windows: HashMap<String, Window>,
}

impl Throttle {
    /// Creates a throttle with the given settings
    pub fn new(options: Options) -> Self {
        Self {
            options,
            windows: HashMap::new(),
        }
    }

    /// The settings in use
    pub fn options(&self) -> Options {
        self.options
    }

    /// Counts a request from `address` made at `now`
    pub fn check(&mut self, address: &str, now: Instant) -> Decision {
        let window = self
            .windows
            .entry(address.to_owned())
            .or_insert(Window {
                count: 0,
                last_reset: now,
            });

        if now.saturating_duration_since(window.last_reset) > self.options.window {
            window.count = 1;
            window.last_reset = now;
        } else {
            window.count = window.count.saturating_add(1);
        }

        Decision {
            allowed: window.count <= self.options.limit,
            remaining: self.options.limit.saturating_sub(window.count),
            reset: window.last_reset + self.options.window,
        }
    }

    /// Forgets clients whose window ended before `now`
    pub fn prune(&mut self, now: Instant) {
        let length = self.options.window;
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.last_reset) <= length);
    }

    /// Number of clients currently tracked
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no client is tracked
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Picks the address a request is counted against
///
/// Uses the first entry of a forwarded-for header, or a shared anonymous
/// key when there is none.
pub fn client_key(forwarded_for: Option<&str>) -> String {
    forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .unwrap_or(throttle::ANONYMOUS)
        .to_owned()
}
