//! Cumulative record of duels between the same players
//!
//! The record lives outside the run, in whatever key-value storage the host
//! provides through [`HistoryStore`]. It is updated once per completed run
//! and never for a run that was quit. Unreadable data counts as no record.

use std::collections::HashMap;

use enum_map::EnumMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    constants::history::STORAGE_KEY,
    input::Player,
    summary::{Summary, Verdict},
};

/// Key-value storage the record is kept in
pub trait HistoryStore {
    /// Returns the raw value stored under `key`
    fn read(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing what was there
    fn write(&mut self, key: &str, value: String);

    /// Forgets the value stored under `key`
    fn remove(&mut self, key: &str);
}

/// A store kept in memory, lost when dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl HistoryStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Wins and ties accumulated over completed runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// Runs won by player one
    #[serde(rename = "p1Wins")]
    pub player1_wins: u32,
    /// Runs won by player two
    #[serde(rename = "p2Wins")]
    pub player2_wins: u32,
    /// Runs that ended in a tie
    pub ties: u32,
    /// Latest name of player one
    #[serde(rename = "p1Name")]
    pub player1_name: String,
    /// Latest name of player two
    #[serde(rename = "p2Name")]
    pub player2_name: String,
}

impl History {
    /// Adds the verdict of a completed run and keeps the latest names
    pub fn record(&mut self, summary: &Summary, names: &EnumMap<Player, String>) {
        match summary.verdict() {
            Verdict::Winner(Player::Player1) => self.player1_wins += 1,
            Verdict::Winner(Player::Player2) => self.player2_wins += 1,
            Verdict::Tie => self.ties += 1,
        }

        self.player1_name.clone_from(&names[Player::Player1]);
        self.player2_name.clone_from(&names[Player::Player2]);
    }

    /// Runs won by `player`
    pub fn wins(&self, player: Player) -> u32 {
        match player {
            Player::Player1 => self.player1_wins,
            Player::Player2 => self.player2_wins,
        }
    }

    /// Number of runs recorded
    pub fn total(&self) -> u32 {
        self.player1_wins + self.player2_wins + self.ties
    }

    /// Reads the record from `store`
    ///
    /// Returns `None` if nothing is stored or the stored value is unreadable.
    pub fn load<S: HistoryStore + ?Sized>(store: &S) -> Option<Self> {
        let raw = store.read(STORAGE_KEY)?;

        match serde_json::from_str(&raw) {
            Ok(history) => Some(history),
            Err(e) => {
                warn!("ignoring unreadable history: {e}");
                None
            }
        }
    }

    /// Writes the record to `store`
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn save<S: HistoryStore + ?Sized>(&self, store: &mut S) {
        store.write(
            STORAGE_KEY,
            serde_json::to_string(self).expect("default serializer cannot fail"),
        );
    }

    /// Forgets the record kept in `store`
    pub fn reset<S: HistoryStore + ?Sized>(store: &mut S) {
        store.remove(STORAGE_KEY);
    }

    /// Loads the record, adds a completed run to it and saves it back
    pub fn record_in<S: HistoryStore + ?Sized>(
        store: &mut S,
        summary: &Summary,
        names: &EnumMap<Player, String>,
    ) -> Self {
        let mut history = Self::load(store).unwrap_or_default();
        history.record(summary, names);
        history.save(store);
        history
    }
}
