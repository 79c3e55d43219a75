//! Game modes and the policies they select
//!
//! A mode is fixed for a whole run. It decides how long each question
//! stays open, how long the reveal is held, whether the first responder
//! is tracked, and how questions must be shaped.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Duration;

use crate::constants::{question, timing};

/// The three ways a duel can be played
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Classic quiz: one point per correct answer
    #[default]
    #[display("normal")]
    Normal,
    /// Shorter clock, the point goes to the fastest correct player
    #[display("speed")]
    Speed,
    /// Find the option that does not share the theme of the other three
    #[serde(rename = "intrus", alias = "odd_one_out")]
    #[display("intrus")]
    OddOneOut,
}

/// A mode name that matches no mode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown game mode {0:?}")]
pub struct UnknownMode(pub String);

impl FromStr for GameMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "speed" => Ok(Self::Speed),
            "intrus" | "odd_one_out" => Ok(Self::OddOneOut),
            _ => Err(UnknownMode(s.to_owned())),
        }
    }
}

impl GameMode {
    /// Seconds on the clock for each question
    pub fn time_limit_secs(self) -> u64 {
        match self {
            Self::Normal => timing::NORMAL_TIME_LIMIT,
            Self::Speed => timing::SPEED_TIME_LIMIT,
            Self::OddOneOut => timing::ODD_ONE_OUT_TIME_LIMIT,
        }
    }

    /// Time each question stays open
    pub fn time_limit(self) -> Duration {
        Duration::from_secs(self.time_limit_secs())
    }

    /// Pause after both players answered, before the reveal
    pub fn grace_delay(self) -> Duration {
        Duration::from_millis(timing::GRACE_DELAY)
    }

    /// Pause after the reveal, before advancing or completing
    pub fn hold_delay(self) -> Duration {
        match self {
            Self::OddOneOut => Duration::from_millis(timing::ODD_ONE_OUT_HOLD_DELAY),
            Self::Normal | Self::Speed => Duration::from_millis(timing::HOLD_DELAY),
        }
    }

    /// Whether the first player to answer is recorded
    pub fn tracks_first_responder(self) -> bool {
        matches!(self, Self::Speed)
    }

    /// Whether the question text stays hidden until the reveal
    ///
    /// In Odd-One-Out the text is the common theme, which would give
    /// the answer away.
    pub fn hides_question_until_reveal(self) -> bool {
        matches!(self, Self::OddOneOut)
    }

    /// Exact number of answer options this mode requires, if any
    pub fn required_answer_count(self) -> Option<usize> {
        match self {
            Self::OddOneOut => Some(question::ODD_ONE_OUT_ANSWER_COUNT),
            Self::Normal | Self::Speed => None,
        }
    }
}
