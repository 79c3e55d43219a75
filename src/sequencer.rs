//! Question sequencing and per-question outcomes
//!
//! The sequencer records exactly one [`OutcomeRecord`] per revealed
//! question, in question order, and decides after the hold delay whether
//! the run moves on or is over.

use serde::{Deserialize, Serialize};

use crate::{
    input::{Answers, Player},
    mode::GameMode,
    question::Question,
};

/// What happened on one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    /// The question text (the theme in Odd-One-Out mode)
    pub question: String,
    /// Index of the correct (or odd) option
    pub correct_index: usize,
    /// Player one's locked choice, `None` if they never answered
    pub player1_choice: Option<usize>,
    /// Player two's locked choice, `None` if they never answered
    pub player2_choice: Option<usize>,
    /// Who scored the point in Speed mode; always `none` in other modes
    pub speed_winner: SpeedWinner,
}

/// Who scored the point of a Speed question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedWinner {
    /// Player one scored
    Player1,
    /// Player two scored
    Player2,
    /// Nobody scored, or the question was not played in Speed mode
    #[default]
    None,
}

impl SpeedWinner {
    /// The player who scored, if any
    pub fn player(self) -> Option<Player> {
        match self {
            Self::Player1 => Some(Player::Player1),
            Self::Player2 => Some(Player::Player2),
            Self::None => None,
        }
    }
}

impl From<Option<Player>> for SpeedWinner {
    fn from(player: Option<Player>) -> Self {
        match player {
            Some(Player::Player1) => Self::Player1,
            Some(Player::Player2) => Self::Player2,
            None => Self::None,
        }
    }
}

impl OutcomeRecord {
    /// Builds the record of a revealed question
    pub fn new(question: &Question, answers: &Answers, mode: GameMode) -> Self {
        Self {
            question: question.text.clone(),
            correct_index: question.correct_index,
            player1_choice: answers.choice(Player::Player1),
            player2_choice: answers.choice(Player::Player2),
            speed_winner: speed_winner(mode, question.correct_index, answers).into(),
        }
    }

    /// The choice `player` locked on this question
    pub fn choice(&self, player: Player) -> Option<usize> {
        match player {
            Player::Player1 => self.player1_choice,
            Player::Player2 => self.player2_choice,
        }
    }

    /// Whether `player` picked the correct option; unanswered is incorrect
    pub fn is_correct(&self, player: Player) -> bool {
        self.choice(player) == Some(self.correct_index)
    }
}

/// Decides who earns a Speed point
///
/// Both correct: the first responder. Only one correct: that player.
/// Neither correct, or any other mode: nobody.
pub fn speed_winner(mode: GameMode, correct_index: usize, answers: &Answers) -> Option<Player> {
    if mode != GameMode::Speed {
        return None;
    }

    let correct = |player| answers.choice(player) == Some(correct_index);

    match (correct(Player::Player1), correct(Player::Player2)) {
        (true, true) => answers.first_responder(),
        (true, false) => Some(Player::Player1),
        (false, true) => Some(Player::Player2),
        (false, false) => None,
    }
}

/// Where the run goes after the hold delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Present the question at this index
    Question(usize),
    /// Every question has been played
    Complete,
}

/// Walks through the question indices and collects outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequencer {
    index: usize,
    count: usize,
    outcomes: Vec<OutcomeRecord>,
}

impl Sequencer {
    /// Creates a sequencer over `count` questions, positioned on the first
    pub fn new(count: usize) -> Self {
        Self {
            index: 0,
            count,
            outcomes: Vec::with_capacity(count),
        }
    }

    /// Index of the current question
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total number of questions
    pub fn count(&self) -> usize {
        self.count
    }

    /// Outcomes recorded so far, in question order
    pub fn outcomes(&self) -> &[OutcomeRecord] {
        &self.outcomes
    }

    /// Whether the current question already has its outcome
    pub fn is_recorded(&self) -> bool {
        self.outcomes.len() > self.index
    }

    /// Records the outcome of the current question
    ///
    /// Returns `None` if the current question was already recorded.
    pub fn record(
        &mut self,
        question: &Question,
        answers: &Answers,
        mode: GameMode,
    ) -> Option<&OutcomeRecord> {
        if self.is_recorded() {
            return None;
        }

        self.outcomes
            .push(OutcomeRecord::new(question, answers, mode));
        self.outcomes.last()
    }

    /// Moves past the current question
    pub fn advance(&mut self) -> Next {
        if self.index + 1 >= self.count {
            Next::Complete
        } else {
            self.index += 1;
            Next::Question(self.index)
        }
    }
}
