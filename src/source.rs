//! Question generation boundary
//!
//! Questions come from an external text generator. This module builds the
//! prompt for a topic and mode, hands it to a [`QuestionSource`], and turns
//! the raw reply into questions: code fences are stripped, the JSON is
//! parsed, too short a set is rejected and too long a set is cut down.
//! Requests are counted per client by a [`Throttle`] before anything is
//! generated.

use garde::Validate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Instant;

use crate::{
    constants::source,
    mode::GameMode,
    question::Question,
    throttle::{self, Decision, Throttle},
};

/// Errors that can occur while obtaining questions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The topic is blank
    #[error("a topic is required")]
    EmptyTopic,
    /// The request is out of bounds
    #[error("invalid request: {0}")]
    Invalid(String),
    /// The client sent too many requests
    #[error("too many requests, {} left in this window", .0.remaining)]
    Throttled(Decision),
    /// The generator replied with something that is not a question list
    #[error("generated questions are malformed: {0}")]
    Malformed(String),
    /// The generator produced fewer questions than the lower bound
    #[error("{found} questions generated, at least {min} required")]
    TooFew {
        /// Questions received
        found: usize,
        /// Lower bound in effect
        min: usize,
    },
    /// The generator could not be reached
    #[error("question generator unavailable: {0}")]
    Unavailable(String),
}

/// Bounds on the number of generated questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Options {
    /// Fewer questions than this is an error
    #[garde(range(min = 1))]
    pub min_questions: usize,
    /// Questions beyond this are dropped; also the count asked for
    #[garde(custom(|v, _| validate_max_questions(v, self.min_questions)))]
    pub max_questions: usize,
}

fn validate_max_questions(max: &usize, min: usize) -> garde::Result {
    if *max >= min {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "upper bound {max} is below the lower bound {min}"
        )))
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min_questions: source::MIN_QUESTION_COUNT,
            max_questions: source::QUESTION_COUNT,
        }
    }
}

/// What the players asked questions about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuizRequest {
    /// Quiz topic
    #[garde(length(chars, max = source::MAX_TOPIC_LENGTH))]
    pub topic: String,
    /// Game mode the questions are for
    #[garde(skip)]
    #[serde(default)]
    pub mode: GameMode,
}

/// Instructions sent to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// Standing instructions
    pub system: String,
    /// The request itself
    pub user: String,
}

const SYSTEM_PROMPT: &str = "Tu es un expert en création de quiz. \
    Tu réponds toujours avec du JSON valide uniquement, sans aucun markdown.";

impl QuizRequest {
    /// Creates a request
    pub fn new<S: Into<String>>(topic: S, mode: GameMode) -> Self {
        Self {
            topic: topic.into(),
            mode,
        }
    }

    /// Checks the request and trims its topic
    ///
    /// # Errors
    ///
    /// * `Error::EmptyTopic` - the topic is blank
    /// * `Error::Invalid` - the topic is too long
    pub fn checked(&self) -> Result<Self, Error> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(Error::EmptyTopic);
        }

        let request = Self::new(topic, self.mode);
        request
            .validate()
            .map_err(|report| Error::Invalid(report.to_string()))?;

        Ok(request)
    }

    /// Builds the prompt asking for `count` questions
    pub fn prompt(&self, count: usize) -> Prompt {
        let topic = &self.topic;

        let user = match self.mode {
            GameMode::OddOneOut => format!(
                "Tu es un créateur de quiz. Génère exactement {count} énigmes \"intrus\" \
                 sur le sujet suivant : \"{topic}\".\n\n\
                 Réponds UNIQUEMENT avec un tableau JSON valide, sans markdown.\n\
                 Chaque élément doit avoir cette structure exacte :\n\
                 {{\"question\": \"Thème commun aux trois autres mots\", \
                 \"answers\": [\"Mot 1\", \"Mot 2\", \"Mot 3\", \"Mot 4\"], \"correctIndex\": 0}}\n\n\
                 Règles :\n\
                 - Exactement {count} énigmes.\n\
                 - Chaque énigme a EXACTEMENT 4 réponses.\n\
                 - 3 réponses partagent un thème commun, 1 réponse est l'INTRUS.\n\
                 - correctIndex est l'index (0-3) de l'INTRUS.\n\
                 - \"question\" décrit le thème commun, il sera révélé plus tard.\n\
                 - Tout doit être en français."
            ),
            GameMode::Normal | GameMode::Speed => {
                let mut user = format!(
                    "Tu es un créateur de quiz. Génère exactement {count} questions de quiz \
                     sur le sujet suivant : \"{topic}\".\n\n\
                     Réponds UNIQUEMENT avec un tableau JSON valide, sans markdown.\n\
                     Chaque élément doit avoir cette structure exacte :\n\
                     {{\"question\": \"La question\", \
                     \"answers\": [\"Réponse A\", \"Réponse B\", \"Réponse C\", \"Réponse D\"], \
                     \"correctIndex\": 0}}\n\n\
                     Règles :\n\
                     - Exactement {count} questions.\n\
                     - Entre 2 et 4 réponses par question.\n\
                     - correctIndex est l'index (à partir de 0) de la bonne réponse.\n\
                     - Les questions doivent être variées et intéressantes.\n\
                     - Tout doit être en français."
                );
                if self.mode == GameMode::Speed {
                    user.push_str(
                        "\n- Mode Rapidité : des questions SIMPLES et INTUITIVES, \
                         de culture générale accessible, auxquelles on répond sans \
                         longue réflexion.",
                    );
                }
                user
            }
        };

        Prompt {
            system: SYSTEM_PROMPT.to_owned(),
            user,
        }
    }
}

/// Something that turns a prompt into raw generated text
pub trait QuestionSource {
    /// Runs the prompt and returns the generator's reply
    ///
    /// # Errors
    ///
    /// Returns `Error::Unavailable` if the generator cannot be reached.
    fn generate(&mut self, prompt: &Prompt) -> Result<String, Error>;
}

/// Strips the first `prefix` of `text`, ignoring ASCII case
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .and_then(|_| text.get(prefix.len()..))
}

/// Removes markdown code fences around a reply
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let text = strip_prefix_ignore_case(text, "```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text)
        .trim();
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parses a generator reply into questions
///
/// Questions are not checked individually here; a run skips the ones it
/// cannot play.
///
/// # Errors
///
/// * `Error::Malformed` - the reply is not a JSON list of questions
/// * `Error::TooFew` - fewer questions than `options.min_questions`
pub fn parse_response(text: &str, options: &Options) -> Result<Vec<Question>, Error> {
    let mut questions: Vec<Question> = serde_json::from_str(strip_fences(text))
        .map_err(|e| Error::Malformed(e.to_string()))?;

    if questions.len() < options.min_questions {
        return Err(Error::TooFew {
            found: questions.len(),
            min: options.min_questions,
        });
    }

    if questions.len() > options.max_questions {
        debug!(
            "dropping {} extra generated questions",
            questions.len() - options.max_questions
        );
        questions.truncate(options.max_questions);
    } else if questions.len() < options.max_questions {
        warn!(
            "generator under-delivered: {} of {} questions",
            questions.len(),
            options.max_questions
        );
    }

    Ok(questions)
}

/// Serves question requests: throttles, prompts, parses
#[derive(Debug)]
pub struct Endpoint<S> {
    source: S,
    throttle: Throttle,
    options: Options,
}

impl<S: QuestionSource> Endpoint<S> {
    /// Creates an endpoint over `source`
    pub fn new(source: S, throttle: Throttle, options: Options) -> Self {
        Self {
            source,
            throttle,
            options,
        }
    }

    /// Handles one request
    ///
    /// # Arguments
    ///
    /// * `forwarded_for` - The client's forwarded-for header, if any
    /// * `request` - What to generate
    /// * `now` - When the request arrived
    ///
    /// # Errors
    ///
    /// * `Error::Throttled` - the client exhausted its quota
    /// * `Error::EmptyTopic` or `Error::Invalid` - the request is unusable
    /// * any error of the source or of [`parse_response`]
    pub fn handle(
        &mut self,
        forwarded_for: Option<&str>,
        request: &QuizRequest,
        now: Instant,
    ) -> Result<Vec<Question>, Error> {
        let client = throttle::client_key(forwarded_for);
        let decision = self.throttle.check(&client, now);
        if !decision.allowed {
            warn!("throttled question request from {client}");
            return Err(Error::Throttled(decision));
        }

        let request = request.checked()?;
        let prompt = request.prompt(self.options.max_questions);

        debug!(
            "generating {} questions on {:?} in {:?} mode",
            self.options.max_questions, request.topic, request.mode
        );

        let reply = self.source.generate(&prompt)?;
        parse_response(&reply, &self.options).inspect_err(|e| warn!("{e}"))
    }

    /// The throttle in use, for pruning
    pub fn throttle_mut(&mut self) -> &mut Throttle {
        &mut self.throttle
    }
}
