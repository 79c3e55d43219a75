//! Final scores of a completed run
//!
//! Scoring depends on the mode. Normal and Odd-One-Out give a point for
//! every question a player got right. Speed gives the point of a question
//! to its speed winner only, so two correct players never both score.

use enum_map::EnumMap;
use itertools::Itertools;
use serde::Serialize;

use crate::{input::Player, mode::GameMode, sequencer::OutcomeRecord};

/// Who won the duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// One player scored more
    Winner(Player),
    /// Both players scored the same
    Tie,
}

/// Scores and per-question points of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    mode: GameMode,
    scores: EnumMap<Player, usize>,
    points: Vec<EnumMap<Player, bool>>,
}

impl Summary {
    /// Scores the outcomes of a run played in `mode`
    pub fn new(mode: GameMode, outcomes: &[OutcomeRecord]) -> Self {
        let points = outcomes
            .iter()
            .map(|outcome| EnumMap::from_fn(|player| Self::earned(mode, outcome, player)))
            .collect_vec();

        let counts = points
            .iter()
            .flat_map(|earned| {
                earned
                    .iter()
                    .filter(|(_, earned)| **earned)
                    .map(|(player, _)| player)
            })
            .counts();

        Self {
            mode,
            scores: EnumMap::from_fn(|player| counts.get(&player).copied().unwrap_or_default()),
            points,
        }
    }

    /// Whether `player` earned the point of `outcome`
    fn earned(mode: GameMode, outcome: &OutcomeRecord, player: Player) -> bool {
        match mode {
            GameMode::Speed => outcome.speed_winner.player() == Some(player),
            GameMode::Normal | GameMode::OddOneOut => outcome.is_correct(player),
        }
    }

    /// The mode the run was played in
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Points scored by `player`
    pub fn score(&self, player: Player) -> usize {
        self.scores[player]
    }

    /// Points scored by both players
    pub fn scores(&self) -> &EnumMap<Player, usize> {
        &self.scores
    }

    /// Number of questions played
    pub fn total(&self) -> usize {
        self.points.len()
    }

    /// Share of the questions `player` scored on, from 0 to 100
    pub fn percentage(&self, player: Player) -> f64 {
        if self.points.is_empty() {
            0.
        } else {
            self.score(player) as f64 * 100. / self.total() as f64
        }
    }

    /// For each question, whether each player earned its point
    pub fn points(&self) -> &[EnumMap<Player, bool>] {
        &self.points
    }

    /// Who won the duel
    pub fn verdict(&self) -> Verdict {
        let player1 = self.score(Player::Player1);
        let player2 = self.score(Player::Player2);

        match player1.cmp(&player2) {
            std::cmp::Ordering::Greater => Verdict::Winner(Player::Player1),
            std::cmp::Ordering::Less => Verdict::Winner(Player::Player2),
            std::cmp::Ordering::Equal => Verdict::Tie,
        }
    }
}
