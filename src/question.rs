//! Questions and the playable question set
//!
//! Questions arrive from an external generator and are trusted only
//! structurally: a question with too few options, too many options, or
//! an answer index outside its options cannot be played and is skipped
//! when the set is built. A set left with no playable question is an
//! error the session has to handle before starting a run.

use garde::Validate;
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mode::GameMode;

/// A single quiz question
///
/// In Odd-One-Out mode `text` is the theme shared by three of the four
/// options and `correct_index` points at the odd one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question, or the common theme in Odd-One-Out mode
    #[serde(rename = "question")]
    #[garde(skip)]
    pub text: String,
    /// The answer options, in key-slot order
    #[garde(length(
        min = crate::constants::question::MIN_ANSWER_COUNT,
        max = crate::constants::question::MAX_ANSWER_COUNT
    ))]
    pub answers: Vec<String>,
    /// Index of the correct (or odd) option
    #[serde(rename = "correctIndex")]
    #[garde(custom(index_within(&self.answers)))]
    pub correct_index: usize,
}

/// Builds a validator checking that an index points into `answers`
fn index_within(answers: &[String]) -> impl FnOnce(&usize, &()) -> garde::Result + '_ {
    move |index: &usize, _ctx: &()| {
        if *index < answers.len() {
            Ok(())
        } else {
            Err(garde::Error::new(format!(
                "index {index} is outside of the {} answer options",
                answers.len()
            )))
        }
    }
}

/// Reasons a question or a question set cannot be played
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// The question failed structural validation
    #[error("invalid question: {0}")]
    Invalid(String),
    /// The mode requires a fixed number of options
    #[error("question has {found} answer options, mode requires {expected}")]
    AnswerCount {
        /// Options carried by the question
        found: usize,
        /// Options the mode requires
        expected: usize,
    },
    /// Nothing is left to play
    #[error("no playable question")]
    NoPlayableQuestion,
}

impl Question {
    /// Creates a question from its text, options and answer index
    pub fn new<S: Into<String>>(text: S, answers: Vec<String>, correct_index: usize) -> Self {
        Self {
            text: text.into(),
            answers,
            correct_index,
        }
    }

    /// Number of answer options
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Whether `index` is the correct (or odd) option
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }

    /// Checks that this question can be played in `mode`
    ///
    /// # Errors
    ///
    /// * `Error::Invalid` - the option count or answer index is out of bounds
    /// * `Error::AnswerCount` - the mode requires a different option count
    pub fn check_playable(&self, mode: GameMode) -> Result<(), Error> {
        self.validate()
            .map_err(|report| Error::Invalid(report.to_string()))?;

        match mode.required_answer_count() {
            Some(expected) if expected != self.answers.len() => Err(Error::AnswerCount {
                found: self.answers.len(),
                expected,
            }),
            _ => Ok(()),
        }
    }
}

/// An ordered, non-empty sequence of playable questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Builds a set from generated questions, skipping unusable ones
    ///
    /// Skipped questions are logged; the remaining questions keep their
    /// relative order.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoPlayableQuestion` if nothing is left to play.
    pub fn playable(questions: Vec<Question>, mode: GameMode) -> Result<Self, Error> {
        let received = questions.len();

        let questions = questions
            .into_iter()
            .enumerate()
            .filter_map(|(position, question)| match question.check_playable(mode) {
                Ok(()) => Some(question),
                Err(e) => {
                    warn!("skipping question {position}: {e}");
                    None
                }
            })
            .collect_vec();

        if questions.is_empty() {
            return Err(Error::NoPlayableQuestion);
        }

        if questions.len() < received {
            warn!(
                "playing {} of {received} received questions",
                questions.len()
            );
        }

        Ok(Self { questions })
    }

    /// Returns the number of questions in the set
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the set holds no question, never the case once built
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the question at `index`
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Iterates the questions in play order
    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }
}
