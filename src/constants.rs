//! Configuration constants for the duel quiz
//!
//! This module contains the timing values, limits and defaults used
//! throughout the game so every component agrees on the same boundaries.

/// Per-question timing
pub mod timing {
    /// Seconds on the clock for a Normal question
    pub const NORMAL_TIME_LIMIT: u64 = 30;
    /// Seconds on the clock for a Speed question
    pub const SPEED_TIME_LIMIT: u64 = 15;
    /// Seconds on the clock for an Odd-One-Out question
    pub const ODD_ONE_OUT_TIME_LIMIT: u64 = 20;
    /// Interval between two countdown ticks, in milliseconds
    pub const TICK_INTERVAL: u64 = 1000;
    /// Pause between "both answered" and the reveal, in milliseconds
    pub const GRACE_DELAY: u64 = 600;
    /// Pause between the reveal and the next question, in milliseconds
    pub const HOLD_DELAY: u64 = 2200;
    /// Hold delay used in Odd-One-Out mode, in milliseconds
    pub const ODD_ONE_OUT_HOLD_DELAY: u64 = 4000;
}

/// Question shape limits
pub mod question {
    /// Minimum number of answer options for a playable question
    pub const MIN_ANSWER_COUNT: usize = 2;
    /// Maximum number of answer options (one per key slot)
    pub const MAX_ANSWER_COUNT: usize = 4;
    /// Exact number of options an Odd-One-Out question must carry
    pub const ODD_ONE_OUT_ANSWER_COUNT: usize = 4;
}

/// Question source limits
pub mod source {
    /// Number of questions requested from the generator
    pub const QUESTION_COUNT: usize = 10;
    /// Default lower bound below which a generated set is rejected
    pub const MIN_QUESTION_COUNT: usize = 5;
    /// Maximum length of a quiz topic
    pub const MAX_TOPIC_LENGTH: usize = 200;
}

/// Request throttle defaults
pub mod throttle {
    /// Requests allowed per window and client
    pub const LIMIT: u32 = 3;
    /// Length of a throttle window, in milliseconds
    pub const WINDOW: u64 = 60_000;
    /// Key used when the client address is unknown
    pub const ANONYMOUS: &str = "anonymous";
}

/// Setup form defaults and limits
pub mod setup {
    /// Maximum length of a player name
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Name used for player one when left blank
    pub const DEFAULT_PLAYER1_NAME: &str = "Joueur 1";
    /// Name used for player two when left blank
    pub const DEFAULT_PLAYER2_NAME: &str = "Joueur 2";
    /// Topic used when left blank
    pub const DEFAULT_TOPIC: &str = "Culture Générale";
    /// Storage key of the last name of player one
    pub const PLAYER1_NAME_KEY: &str = "duelQcm_p1Name";
    /// Storage key of the last name of player two
    pub const PLAYER2_NAME_KEY: &str = "duelQcm_p2Name";
    /// Storage key of the last mode played
    pub const MODE_KEY: &str = "duelQcm_mode";
}

/// Keyboard zones
pub mod input {
    /// Number of answer slots in each player's key zone
    pub const SLOT_COUNT: usize = 4;
}

/// Cumulative history storage
pub mod history {
    /// Storage key of the cumulative record
    pub const STORAGE_KEY: &str = "duelQcm_scores";
}
