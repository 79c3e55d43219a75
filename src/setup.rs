//! Setup form handling
//!
//! Turns what the players typed before a duel into a topic, two names and
//! a mode. Blank fields fall back to defaults; names are trimmed and
//! checked for inappropriate content. The last names and mode are kept in
//! the host's storage and pre-fill the next form.

use enum_map::EnumMap;
use garde::Validate;
use log::warn;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{self, setup},
    history::HistoryStore,
    input::Player,
    mode::GameMode,
    question::{self, Question},
    run::QuizRun,
    source::QuizRequest,
};

/// Errors that can occur while finalizing the setup form
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A field is longer than allowed
    #[error("{0}")]
    TooLong(String),
    /// A name contains inappropriate content
    #[error("name of {0} is inappropriate")]
    Sinful(Player),
}

/// The raw setup form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SetupForm {
    /// Quiz topic, blank for the default one
    #[garde(length(chars, max = constants::source::MAX_TOPIC_LENGTH))]
    #[serde(default)]
    pub topic: String,
    /// Name of player one, blank for the default one
    #[garde(length(chars, max = setup::MAX_NAME_LENGTH))]
    #[serde(default)]
    pub player1: String,
    /// Name of player two, blank for the default one
    #[garde(length(chars, max = setup::MAX_NAME_LENGTH))]
    #[serde(default)]
    pub player2: String,
    /// Game mode
    #[garde(skip)]
    #[serde(default)]
    pub mode: GameMode,
}

/// A checked setup, ready to request questions and start a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
    /// Quiz topic
    pub topic: String,
    /// Display names
    pub names: EnumMap<Player, String>,
    /// Game mode
    pub mode: GameMode,
}

/// Trims `value`, falling back to `default` when nothing is left
fn or_default(value: &str, default: &str) -> String {
    let value = rustrict::trim_whitespace(value);
    if value.is_empty() {
        default.to_owned()
    } else {
        value.to_owned()
    }
}

impl SetupForm {
    /// A blank form pre-filled with the names and mode of the last setup
    ///
    /// Missing values fall back to the defaults; an unknown stored mode is
    /// ignored.
    pub fn recall<S: HistoryStore + ?Sized>(store: &S) -> Self {
        let name = |key: &str, default: &str| {
            store
                .read(key)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let mode = store
            .read(setup::MODE_KEY)
            .and_then(|mode| {
                mode.parse::<GameMode>()
                    .inspect_err(|e| warn!("ignoring stored mode: {e}"))
                    .ok()
            })
            .unwrap_or_default();

        Self {
            topic: String::new(),
            player1: name(setup::PLAYER1_NAME_KEY, setup::DEFAULT_PLAYER1_NAME),
            player2: name(setup::PLAYER2_NAME_KEY, setup::DEFAULT_PLAYER2_NAME),
            mode,
        }
    }

    /// Checks the form and fills in defaults
    ///
    /// # Errors
    ///
    /// * `Error::TooLong` - the topic or a name exceeds its length limit
    /// * `Error::Sinful` - a name contains inappropriate content
    pub fn finalize(&self) -> Result<Setup, Error> {
        self.validate()
            .map_err(|report| Error::TooLong(report.to_string()))?;

        let names = EnumMap::from_fn(|player| match player {
            Player::Player1 => or_default(&self.player1, setup::DEFAULT_PLAYER1_NAME),
            Player::Player2 => or_default(&self.player2, setup::DEFAULT_PLAYER2_NAME),
        });

        if let Some((player, _)) = names
            .iter()
            .find(|(_, name)| name.as_str().is_inappropriate())
        {
            return Err(Error::Sinful(player));
        }

        Ok(Setup {
            topic: or_default(&self.topic, setup::DEFAULT_TOPIC),
            names,
            mode: self.mode,
        })
    }
}

impl Setup {
    /// Keeps the names and mode for the next form
    pub fn remember<S: HistoryStore + ?Sized>(&self, store: &mut S) {
        store.write(setup::PLAYER1_NAME_KEY, self.names[Player::Player1].clone());
        store.write(setup::PLAYER2_NAME_KEY, self.names[Player::Player2].clone());
        store.write(setup::MODE_KEY, self.mode.to_string());
    }

    /// The question request matching this setup
    pub fn request(&self) -> QuizRequest {
        QuizRequest {
            topic: self.topic.clone(),
            mode: self.mode,
        }
    }

    /// Starts a run over generated questions
    ///
    /// # Errors
    ///
    /// Returns `question::Error::NoPlayableQuestion` if none of `questions`
    /// can be played in the chosen mode.
    pub fn run(&self, questions: Vec<Question>) -> Result<QuizRun, question::Error> {
        QuizRun::new(questions, self.mode, self.names.clone())
    }
}
