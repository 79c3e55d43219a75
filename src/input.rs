//! Input arbitration for two players sharing one keyboard
//!
//! Each player owns a zone of four keys, one per answer slot. A raw key is
//! resolved to `(player, slot)` through [`KeyBindings`], then offered to the
//! question's [`Answers`], which accepts only the first valid choice of each
//! player. Events are processed strictly in arrival order, so in Speed mode
//! the first accepted event decides the first responder for good.

use std::collections::HashSet;

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants::input::SLOT_COUNT, mode::GameMode};

/// One of the two players sitting at the keyboard
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Enum,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// Left side of the screen
    #[display("player1")]
    Player1,
    /// Right side of the screen
    #[display("player2")]
    Player2,
}

impl Player {
    /// Both players, left to right
    pub const ALL: [Player; 2] = [Player::Player1, Player::Player2];

    /// The opponent
    pub fn other(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

/// Keys of one player's zone, one list of aliases per answer slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyZone {
    slots: [Vec<String>; SLOT_COUNT],
}

impl KeyZone {
    /// Creates a zone from the aliases of each slot
    pub fn new(slots: [Vec<String>; SLOT_COUNT]) -> Self {
        Self {
            slots: slots.map(|aliases| aliases.into_iter().map(|k| k.to_lowercase()).collect()),
        }
    }

    /// Returns the slot a key belongs to, if any
    fn slot_of(&self, key: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|aliases| aliases.iter().any(|alias| alias.eq_ignore_ascii_case(key)))
    }

    /// The label shown on the button of `slot`
    pub fn label(&self, slot: usize) -> Option<String> {
        self.slots
            .get(slot)
            .and_then(|aliases| aliases.first())
            .map(|key| key.to_uppercase())
    }
}

/// Errors raised by an inconsistent key layout
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// A key appears in more than one slot
    #[error("key {0:?} is bound more than once")]
    Overlap(String),
    /// A slot has no key at all
    #[error("slot {slot} of {player:?} has no key")]
    EmptySlot {
        /// Owner of the slot
        player: Player,
        /// Index of the empty slot
        slot: usize,
    },
}

/// Serialization helper for `KeyBindings`, checked on conversion
#[derive(Deserialize)]
struct KeyBindingsSerde {
    player1: KeyZone,
    player2: KeyZone,
}

/// The two disjoint key zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyBindingsSerde")]
pub struct KeyBindings {
    player1: KeyZone,
    player2: KeyZone,
}

impl TryFrom<KeyBindingsSerde> for KeyBindings {
    type Error = Error;

    fn try_from(serde: KeyBindingsSerde) -> Result<Self, Self::Error> {
        Self::new(serde.player1, serde.player2)
    }
}

impl Default for KeyBindings {
    /// AZERTY layout: `A Z E R` on the left, `U I O P` (or the number
    /// row `1 2 3 4`) on the right
    fn default() -> Self {
        let zone = |slots: [&[&str]; SLOT_COUNT]| {
            KeyZone::new(slots.map(|aliases| aliases.iter().map(|k| (*k).to_owned()).collect()))
        };

        Self {
            player1: zone([&["a"], &["z"], &["e"], &["r"]]),
            player2: zone([
                &["u", "Digit1"],
                &["i", "Digit2"],
                &["o", "Digit3"],
                &["p", "Digit4"],
            ]),
        }
    }
}

impl KeyBindings {
    /// Creates bindings from two zones
    ///
    /// # Errors
    ///
    /// * `Error::EmptySlot` - a slot has no key
    /// * `Error::Overlap` - a key is used twice, within or across zones
    pub fn new(player1: KeyZone, player2: KeyZone) -> Result<Self, Error> {
        let mut seen = HashSet::new();

        for (player, zone) in [(Player::Player1, &player1), (Player::Player2, &player2)] {
            for (slot, aliases) in zone.slots.iter().enumerate() {
                if aliases.is_empty() {
                    return Err(Error::EmptySlot { player, slot });
                }
                for alias in aliases {
                    if !seen.insert(alias.to_lowercase()) {
                        return Err(Error::Overlap(alias.clone()));
                    }
                }
            }
        }

        Ok(Self { player1, player2 })
    }

    /// Returns the zone of `player`
    pub fn zone(&self, player: Player) -> &KeyZone {
        match player {
            Player::Player1 => &self.player1,
            Player::Player2 => &self.player2,
        }
    }

    /// Resolves a raw key identifier to the player and slot it stands for
    ///
    /// Matching is case-insensitive, so a held shift key does not matter.
    pub fn resolve(&self, key: &str) -> Option<(Player, usize)> {
        Player::ALL
            .into_iter()
            .find_map(|player| self.zone(player).slot_of(key).map(|slot| (player, slot)))
    }

    /// Resolves a key press from its character, falling back on its
    /// physical position
    ///
    /// On AZERTY the number row produces `&`, `é`, `"` and `'` without
    /// shift, so the right zone is also bound by position.
    pub fn resolve_press(&self, key: &str, code: Option<&str>) -> Option<(Player, usize)> {
        self.resolve(key).or_else(|| code.and_then(|code| self.resolve(code)))
    }
}

/// Position of a player among the responders of a Speed question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedRank {
    /// Answered first
    First,
    /// Answered after the opponent
    Second,
}

/// Why a choice was not taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// The question has already been revealed
    Revealed,
    /// The player already locked an answer for this question
    AlreadyAnswered,
    /// The slot has no option on this question
    OutOfRange,
}

/// Result of offering a choice to a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    /// The choice is now locked
    Accepted {
        /// Who answered
        player: Player,
        /// The option they picked
        index: usize,
        /// Whether they became the first responder
        first: bool,
    },
    /// Nothing changed
    Ignored(Ignored),
}

/// Choices made on the current question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    choices: EnumMap<Player, Option<usize>>,
    first_responder: Option<Player>,
}

impl Answers {
    /// Offers `index` as `player`'s answer
    ///
    /// The first in-range choice of each player is kept; everything after
    /// it, and everything once the question is revealed, is ignored.
    pub fn choose(
        &mut self,
        player: Player,
        index: usize,
        answer_count: usize,
        revealed: bool,
        mode: GameMode,
    ) -> Arbitration {
        if revealed {
            return Arbitration::Ignored(Ignored::Revealed);
        }
        if self.choices[player].is_some() {
            return Arbitration::Ignored(Ignored::AlreadyAnswered);
        }
        if index >= answer_count {
            return Arbitration::Ignored(Ignored::OutOfRange);
        }

        self.choices[player] = Some(index);

        let first = mode.tracks_first_responder() && self.first_responder.is_none();
        if first {
            self.first_responder = Some(player);
        }

        Arbitration::Accepted {
            player,
            index,
            first,
        }
    }

    /// The locked choice of `player`
    pub fn choice(&self, player: Player) -> Option<usize> {
        self.choices[player]
    }

    /// All locked choices
    pub fn choices(&self) -> &EnumMap<Player, Option<usize>> {
        &self.choices
    }

    /// Whether `player` has locked a choice
    pub fn has_answered(&self, player: Player) -> bool {
        self.choices[player].is_some()
    }

    /// Whether both players have locked a choice
    pub fn both_answered(&self) -> bool {
        self.choices.values().all(Option::is_some)
    }

    /// The player who answered first, Speed mode only
    pub fn first_responder(&self) -> Option<Player> {
        self.first_responder
    }

    /// Where `player` stands among responders, Speed mode only
    pub fn speed_rank(&self, player: Player) -> Option<SpeedRank> {
        if !self.has_answered(player) {
            return None;
        }
        match self.first_responder {
            Some(first) if first == player => Some(SpeedRank::First),
            Some(_) => Some(SpeedRank::Second),
            None => None,
        }
    }
}
