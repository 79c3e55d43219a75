//! Virtual-time alarm queue
//!
//! A run never sleeps: it hands every delayed action to a scheduling
//! callback. Hosts that live in a real event loop forward those calls to
//! their own timers. Hosts without one, and the tests, can collect them in
//! an [`AlarmQueue`] and deliver them in due order while advancing a
//! virtual clock.

use std::collections::BTreeMap;

use derive_where::derive_where;
use web_time::Duration;

/// Pending alarms ordered by due time, then by scheduling order
#[derive(Debug)]
#[derive_where(Default)]
pub struct AlarmQueue<A> {
    now: Duration,
    sequence: u64,
    pending: BTreeMap<(Duration, u64), A>,
}

impl<A> AlarmQueue<A> {
    /// Creates an empty queue at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedules `alarm` to become due `delay` after the current time
    ///
    /// Alarms due at the same instant are delivered in scheduling order.
    pub fn schedule(&mut self, alarm: A, delay: Duration) {
        self.pending.insert((self.now + delay, self.sequence), alarm);
        self.sequence += 1;
    }

    /// Removes the earliest alarm due no later than `until`
    ///
    /// The clock moves to the alarm's due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<(Duration, A)> {
        let (&(due, _), _) = self.pending.first_key_value()?;
        if due > until {
            return None;
        }

        let ((due, _), alarm) = self.pending.pop_first()?;
        self.now = self.now.max(due);

        Some((due, alarm))
    }

    /// Moves the clock forward without delivering anything
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }

    /// Due time of the earliest pending alarm
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Number of pending alarms
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending alarm
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
