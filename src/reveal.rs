//! Reveal policy for a single question
//!
//! A question collects answers until either both players have answered
//! (then it settles for a short grace delay before revealing) or the clock
//! runs out (then it reveals at once). Every transition is guarded by the
//! phase it starts from, so whichever trigger comes second finds the
//! question already revealed and does nothing.

use serde::{Deserialize, Serialize};

/// Phase of the current question
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    /// Not presented yet
    #[default]
    Unstarted,
    /// Waiting for answers
    Collecting,
    /// Both players answered, the grace delay is running
    Settling,
    /// Correct answer and both choices are visible
    Revealed,
}

/// Tracks the phase of one question and owns its transitions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealPolicy {
    phase: Phase,
}

impl RevealPolicy {
    /// Attempts to transition from one phase to another
    ///
    /// # Returns
    ///
    /// `true` if the transition was made, `false` if the current phase
    /// didn't match `before`
    fn change_phase(&mut self, before: Phase, after: Phase) -> bool {
        if self.phase == before {
            self.phase = after;

            true
        } else {
            false
        }
    }

    /// The question is presented and starts accepting answers
    pub fn start(&mut self) -> bool {
        self.change_phase(Phase::Unstarted, Phase::Collecting)
    }

    /// Both players answered; the caller schedules the grace delay
    pub fn both_answered(&mut self) -> bool {
        self.change_phase(Phase::Collecting, Phase::Settling)
    }

    /// The grace delay elapsed
    pub fn grace_elapsed(&mut self) -> bool {
        self.change_phase(Phase::Settling, Phase::Revealed)
    }

    /// The clock reached zero before the reveal
    ///
    /// This also cuts a running grace delay short.
    pub fn timer_expired(&mut self) -> bool {
        self.change_phase(Phase::Collecting, Phase::Revealed)
            || self.change_phase(Phase::Settling, Phase::Revealed)
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether answers are still accepted
    pub fn accepts_input(&self) -> bool {
        self.phase == Phase::Collecting
    }

    /// Whether the question has been revealed
    pub fn is_revealed(&self) -> bool {
        self.phase == Phase::Revealed
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn collecting() -> RevealPolicy {
        let mut policy = RevealPolicy::default();
        assert!(policy.start());
        policy
    }

    #[test]
    fn test_default_is_unstarted() {
        let policy = RevealPolicy::default();
        assert_eq!(policy.phase(), Phase::Unstarted);
        assert!(!policy.accepts_input());
        assert!(!policy.is_revealed());
    }

    #[test]
    fn test_start_once() {
        let mut policy = collecting();
        assert!(policy.accepts_input());
        assert!(!policy.start());
    }

    #[test]
    fn test_both_answered_then_grace() {
        let mut policy = collecting();

        assert!(policy.both_answered());
        assert_eq!(policy.phase(), Phase::Settling);
        assert!(!policy.accepts_input());
        assert!(!policy.is_revealed());

        assert!(policy.grace_elapsed());
        assert!(policy.is_revealed());
    }

    #[test]
    fn test_timer_expiry_reveals_immediately() {
        let mut policy = collecting();
        assert!(policy.timer_expired());
        assert!(policy.is_revealed());
    }

    #[test]
    fn test_timer_expiry_during_grace_wins() {
        let mut policy = collecting();
        policy.both_answered();

        assert!(policy.timer_expired());
        // The grace alarm arrives afterwards and must not reveal again
        assert!(!policy.grace_elapsed());
        assert!(policy.is_revealed());
    }

    #[test]
    fn test_no_double_reveal() {
        let mut policy = collecting();
        policy.both_answered();
        assert!(policy.grace_elapsed());

        assert!(!policy.timer_expired());
        assert!(!policy.grace_elapsed());
        assert!(!policy.both_answered());
    }

    #[test]
    fn test_grace_without_answers_is_ignored() {
        let mut policy = collecting();
        assert!(!policy.grace_elapsed());
        assert_eq!(policy.phase(), Phase::Collecting);
    }
}
