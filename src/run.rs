//! Quiz run state machine
//!
//! A [`QuizRun`] plays one ordered set of questions for two players in a
//! fixed mode. It only ever changes in response to a discrete event: an
//! [`IncomingMessage`] from the keyboard or the panels, or an
//! [`AlarmMessage`] it scheduled earlier through the host's callback.
//!
//! Alarms are fire-and-forget. Each one carries the id of the run and the
//! index of the question it was scheduled for, and is checked against the
//! live state when it comes back. An alarm from a superseded question, a
//! quit run, or a phase that already moved on is dropped, which is what
//! cancelling it would have achieved.

use std::{fmt::Debug, str::FromStr};

use enum_map::EnumMap;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay, skip_serializing_none};
use uuid::Uuid;
use web_time::Duration;

use crate::{
    input::{Answers, Arbitration, KeyBindings, Player, SpeedRank},
    mode::GameMode,
    question::{self, Question, QuestionSet},
    reveal::RevealPolicy,
    sequencer::{Next, OutcomeRecord, Sequencer, SpeedWinner},
    session::Tunnel,
    timer::{Countdown, Tick},
};

/// A unique identifier for a run
///
/// Alarms carry it so that a host juggling several runs, or starting a new
/// run before the previous one's alarms fired, never mixes them up.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Where the run is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Built, first question not presented yet
    #[default]
    Initializing,
    /// Questions are being played
    Playing,
    /// Every question was played and the outcomes were delivered
    Completed,
    /// Abandoned before the end
    Quit,
}

/// Events coming from the players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomingMessage {
    /// A key press on the shared keyboard
    Key {
        /// The character the key produced, as the layout maps it
        key: String,
        /// The physical key position, when the host knows it
        code: Option<String>,
    },
    /// A click on one of a player's answer buttons
    Choose {
        /// Owner of the panel
        player: Player,
        /// Answer slot that was clicked
        index: usize,
    },
    /// Leave the run without scoring it
    Quit,
}

/// Delayed events a run schedules for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One second elapsed on the question clock
    Tick {
        /// Run that scheduled the alarm
        run: RunId,
        /// Question the alarm belongs to
        index: usize,
    },
    /// The grace delay after both answers elapsed
    Reveal {
        /// Run that scheduled the alarm
        run: RunId,
        /// Question the alarm belongs to
        index: usize,
    },
    /// The reveal was held long enough
    Advance {
        /// Run that scheduled the alarm
        run: RunId,
        /// Question the alarm belongs to
        index: usize,
    },
}

impl AlarmMessage {
    /// Run that scheduled the alarm
    pub fn run(&self) -> RunId {
        match self {
            Self::Tick { run, .. } | Self::Reveal { run, .. } | Self::Advance { run, .. } => *run,
        }
    }

    /// Question the alarm belongs to
    pub fn index(&self) -> usize {
        match self {
            Self::Tick { index, .. } | Self::Reveal { index, .. } | Self::Advance { index, .. } => {
                *index
            }
        }
    }
}

/// Utility type for content that may not be shown yet
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum PossiblyHidden<T> {
    /// Content is visible
    Visible(T),
    /// Content is hidden until the reveal
    Hidden,
}

/// Incremental updates sent to the view while the run progresses
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum UpdateMessage {
    /// A new question is open for answers
    QuestionAnnouncement {
        /// Index of the question (0-based)
        index: usize,
        /// Number of questions in the run
        count: usize,
        /// Question text, hidden in Odd-One-Out mode
        question: PossiblyHidden<String>,
        /// Answer options in slot order
        answers: Vec<String>,
        /// Time on the clock
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// Seconds left on the clock
    TimeRemaining(u64),
    /// A player locked an answer; which one stays hidden until the reveal
    Answered {
        /// Who answered
        player: Player,
        /// First or second responder, Speed mode only
        rank: Option<SpeedRank>,
    },
    /// The correct option and both choices
    AnswersResults {
        /// Question text, now always visible
        question: String,
        /// Index of the correct (or odd) option
        correct_index: usize,
        /// What each player picked
        choices: EnumMap<Player, Option<usize>>,
        /// Who scored the Speed point
        speed_winner: SpeedWinner,
    },
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Full snapshots for a view attaching in the middle of a run
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    /// The run has not started
    Waiting {
        /// Number of questions in the run
        count: usize,
        /// The mode of the run
        mode: GameMode,
        /// Display names
        names: EnumMap<Player, String>,
    },
    /// A question is open for answers
    Question {
        /// Index of the question
        index: usize,
        /// Number of questions in the run
        count: usize,
        /// Question text, hidden in Odd-One-Out mode
        question: PossiblyHidden<String>,
        /// Answer options in slot order
        answers: Vec<String>,
        /// Seconds left on the clock
        remaining: u64,
        /// Whether each player has answered
        answered: EnumMap<Player, bool>,
        /// First or second responder, Speed mode only
        ranks: EnumMap<Player, Option<SpeedRank>>,
    },
    /// The current question is revealed
    Results {
        /// Index of the question
        index: usize,
        /// Number of questions in the run
        count: usize,
        /// Question text
        question: String,
        /// Answer options in slot order
        answers: Vec<String>,
        /// Index of the correct (or odd) option
        correct_index: usize,
        /// What each player picked
        choices: EnumMap<Player, Option<usize>>,
        /// Who scored the Speed point
        speed_winner: SpeedWinner,
    },
    /// Every question was played
    Completed {
        /// One record per question, in order
        outcomes: Vec<OutcomeRecord>,
    },
    /// The run was abandoned
    Quit,
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// One duel over a fixed set of questions
#[derive(Serialize, Deserialize)]
pub struct QuizRun {
    id: RunId,
    questions: QuestionSet,
    mode: GameMode,
    names: EnumMap<Player, String>,
    bindings: KeyBindings,
    sequencer: Sequencer,
    answers: Answers,
    reveal: RevealPolicy,
    timer: Countdown,
    status: Status,
}

impl Debug for QuizRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizRun")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("index", &self.sequencer.index())
            .finish_non_exhaustive()
    }
}

impl QuizRun {
    /// Creates a run over the playable subset of `questions`
    ///
    /// # Errors
    ///
    /// Returns `question::Error::NoPlayableQuestion` if no question can be
    /// played in `mode`.
    pub fn new(
        questions: Vec<Question>,
        mode: GameMode,
        names: EnumMap<Player, String>,
    ) -> Result<Self, question::Error> {
        let questions = QuestionSet::playable(questions, mode)?;

        Ok(Self {
            id: RunId::new(),
            sequencer: Sequencer::new(questions.len()),
            questions,
            mode,
            names,
            bindings: KeyBindings::default(),
            answers: Answers::default(),
            reveal: RevealPolicy::default(),
            timer: Countdown::new(mode.time_limit_secs()),
            status: Status::Initializing,
        })
    }

    /// Replaces the default key layout
    #[must_use]
    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Attempts to transition from one status to another
    fn change_status(&mut self, before: Status, after: Status) -> bool {
        if self.status == before {
            self.status = after;

            true
        } else {
            false
        }
    }

    /// Presents the first question
    ///
    /// Does nothing if the run already started.
    ///
    /// # Arguments
    ///
    /// * `schedule_message` - Function to schedule delayed messages for timing
    /// * `tunnel` - Where view updates go
    pub fn play<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        schedule_message: S,
        tunnel: &T,
    ) {
        if self.change_status(Status::Initializing, Status::Playing) {
            info!(
                "run {} started: {} questions in {:?} mode",
                self.id,
                self.questions.len(),
                self.mode
            );
            self.start_question(schedule_message, tunnel);
        }
    }

    /// Opens the current question: fresh answers, fresh clock
    fn start_question<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        let index = self.sequencer.index();
        let Some(question) = self.questions.get(index) else {
            warn!("run {} has no question {index}", self.id);
            return;
        };

        self.answers = Answers::default();
        self.reveal = RevealPolicy::default();
        self.reveal.start();
        self.timer = Countdown::new(self.mode.time_limit_secs());

        debug!("run {}: question {index} open", self.id);

        tunnel.send_message(&UpdateMessage::QuestionAnnouncement {
            index,
            count: self.questions.len(),
            question: self.visible_text(question),
            answers: question.answers.clone(),
            duration: self.mode.time_limit(),
        });

        match self.timer.start() {
            Tick::Running(_) => schedule_message(
                AlarmMessage::Tick {
                    run: self.id,
                    index,
                },
                Countdown::TICK,
            ),
            Tick::Expired => {
                if self.reveal.timer_expired() {
                    self.reveal_question(schedule_message, tunnel);
                }
            }
            Tick::Ignored => {}
        }
    }

    /// The question text as the view may show it right now
    fn visible_text(&self, question: &Question) -> PossiblyHidden<String> {
        if self.mode.hides_question_until_reveal() && !self.reveal.is_revealed() {
            PossiblyHidden::Hidden
        } else {
            PossiblyHidden::Visible(question.text.clone())
        }
    }

    /// Handles an event coming from the players
    ///
    /// # Arguments
    ///
    /// * `message` - The event to handle
    /// * `schedule_message` - Function to schedule delayed messages for timing
    /// * `tunnel` - Where view updates go
    pub fn receive_message<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: IncomingMessage,
        schedule_message: S,
        tunnel: &T,
    ) {
        match message {
            IncomingMessage::Key { key, code } => {
                match self.bindings.resolve_press(&key, code.as_deref()) {
                    Some((player, index)) => self.choose(player, index, schedule_message, tunnel),
                    None => trace!("run {}: unbound key {key:?} ({code:?})", self.id),
                }
            }
            IncomingMessage::Choose { player, index } => {
                self.choose(player, index, schedule_message, tunnel);
            }
            IncomingMessage::Quit => self.quit(tunnel),
        }
    }

    /// Offers a choice to the current question
    fn choose<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        player: Player,
        index: usize,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        if self.status != Status::Playing {
            trace!("run {}: input while {:?}", self.id, self.status);
            return;
        }

        let question_index = self.sequencer.index();
        let Some(question) = self.questions.get(question_index) else {
            return;
        };

        match self.answers.choose(
            player,
            index,
            question.answer_count(),
            self.reveal.is_revealed(),
            self.mode,
        ) {
            Arbitration::Accepted { player, first, .. } => {
                debug!(
                    "run {}: {player} answered question {question_index}{}",
                    self.id,
                    if first { " first" } else { "" }
                );

                tunnel.send_message(&UpdateMessage::Answered {
                    player,
                    rank: self.answers.speed_rank(player),
                });

                if self.answers.both_answered() && self.reveal.both_answered() {
                    debug!("run {}: question {question_index} settling", self.id);
                    schedule_message(
                        AlarmMessage::Reveal {
                            run: self.id,
                            index: question_index,
                        },
                        self.mode.grace_delay(),
                    );
                }
            }
            Arbitration::Ignored(reason) => {
                trace!(
                    "run {}: ignored {player} choice {index}: {reason:?}",
                    self.id
                );
            }
        }
    }

    /// Handles an alarm this run scheduled earlier
    ///
    /// Alarms from another run, for another question, or arriving after the
    /// run ended are dropped.
    ///
    /// # Arguments
    ///
    /// * `message` - The alarm that fired
    /// * `schedule_message` - Function to schedule delayed messages for timing
    /// * `tunnel` - Where view updates go
    pub fn receive_alarm<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        if message.run() != self.id
            || message.index() != self.sequencer.index()
            || self.status != Status::Playing
        {
            trace!("run {}: stale alarm {message:?}", self.id);
            return;
        }

        match message {
            AlarmMessage::Tick { index, .. } => match self.timer.tick() {
                Tick::Running(remaining) => {
                    tunnel.send_message(&UpdateMessage::TimeRemaining(remaining));
                    schedule_message(
                        AlarmMessage::Tick {
                            run: self.id,
                            index,
                        },
                        Countdown::TICK,
                    );
                }
                Tick::Expired => {
                    tunnel.send_message(&UpdateMessage::TimeRemaining(0));
                    if self.reveal.timer_expired() {
                        debug!("run {}: time is up on question {index}", self.id);
                        self.reveal_question(schedule_message, tunnel);
                    }
                }
                Tick::Ignored => trace!("run {}: tick after the clock stopped", self.id),
            },
            AlarmMessage::Reveal { .. } => {
                if self.reveal.grace_elapsed() {
                    self.reveal_question(schedule_message, tunnel);
                } else {
                    trace!("run {}: question already revealed", self.id);
                }
            }
            AlarmMessage::Advance { .. } => {
                if self.reveal.is_revealed() && self.sequencer.is_recorded() {
                    self.advance(schedule_message, tunnel);
                }
            }
        }
    }

    /// Freezes the clock, records the outcome and holds the reveal
    fn reveal_question<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        self.timer.cancel();

        let index = self.sequencer.index();
        let Some(question) = self.questions.get(index) else {
            return;
        };
        let Some(outcome) = self.sequencer.record(question, &self.answers, self.mode) else {
            return;
        };

        debug!(
            "run {}: question {index} revealed with {} seconds left",
            self.id,
            self.timer.remaining()
        );

        tunnel.send_message(&UpdateMessage::AnswersResults {
            question: outcome.question.clone(),
            correct_index: outcome.correct_index,
            choices: *self.answers.choices(),
            speed_winner: outcome.speed_winner,
        });

        schedule_message(
            AlarmMessage::Advance { run: self.id, index },
            self.mode.hold_delay(),
        );
    }

    /// Moves to the next question, or delivers the outcomes after the last
    fn advance<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        schedule_message: S,
        tunnel: &T,
    ) {
        match self.sequencer.advance() {
            Next::Question(_) => self.start_question(schedule_message, tunnel),
            Next::Complete => {
                if self.change_status(Status::Playing, Status::Completed) {
                    info!(
                        "run {} completed after {} questions",
                        self.id,
                        self.sequencer.outcomes().len()
                    );
                    tunnel.complete(self.sequencer.outcomes());
                }
            }
        }
    }

    /// Abandons the run
    ///
    /// Stops the clock and signals the quit once. Every alarm still in
    /// flight is dropped when it arrives. Does nothing once the run is over.
    pub fn quit<T: Tunnel>(&mut self, tunnel: &T) {
        if self.change_status(Status::Initializing, Status::Quit)
            || self.change_status(Status::Playing, Status::Quit)
        {
            self.timer.cancel();
            info!(
                "run {} quit on question {}",
                self.id,
                self.sequencer.index()
            );
            tunnel.quit();
        }
    }

    /// Builds a full snapshot for a view attaching now
    pub fn state_message(&self) -> SyncMessage {
        let count = self.questions.len();
        let index = self.sequencer.index();

        match (self.status, self.questions.get(index)) {
            (Status::Initializing, _) | (Status::Playing, None) => SyncMessage::Waiting {
                count,
                mode: self.mode,
                names: self.names.clone(),
            },
            (Status::Playing, Some(question)) => {
                if self.reveal.is_revealed() {
                    SyncMessage::Results {
                        index,
                        count,
                        question: question.text.clone(),
                        answers: question.answers.clone(),
                        correct_index: question.correct_index,
                        choices: *self.answers.choices(),
                        speed_winner: self
                            .sequencer
                            .outcomes()
                            .get(index)
                            .map(|outcome| outcome.speed_winner)
                            .unwrap_or_default(),
                    }
                } else {
                    SyncMessage::Question {
                        index,
                        count,
                        question: self.visible_text(question),
                        answers: question.answers.clone(),
                        remaining: self.timer.remaining(),
                        answered: EnumMap::from_fn(|player| self.answers.has_answered(player)),
                        ranks: EnumMap::from_fn(|player| self.answers.speed_rank(player)),
                    }
                }
            }
            (Status::Completed, _) => SyncMessage::Completed {
                outcomes: self.sequencer.outcomes().to_vec(),
            },
            (Status::Quit, _) => SyncMessage::Quit,
        }
    }

    /// Sends a full snapshot through `tunnel`
    pub fn sync<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_state(&self.state_message());
    }

    /// Id carried by this run's alarms
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Lifecycle status
    pub fn status(&self) -> Status {
        self.status
    }

    /// The mode of the run
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Display name of `player`
    pub fn name(&self, player: Player) -> &str {
        &self.names[player]
    }

    /// The questions being played
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    /// Index of the current question
    pub fn question_index(&self) -> usize {
        self.sequencer.index()
    }

    /// Choices made on the current question
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Whether the current question is revealed
    pub fn is_revealed(&self) -> bool {
        self.reveal.is_revealed()
    }

    /// Seconds left on the current question
    pub fn time_remaining(&self) -> u64 {
        self.timer.remaining()
    }

    /// Outcomes recorded so far
    pub fn outcomes(&self) -> &[OutcomeRecord] {
        self.sequencer.outcomes()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use enum_map::enum_map;

    use super::*;
    use crate::alarm::AlarmQueue;

    #[derive(Debug, Clone, Default)]
    struct MockTunnel {
        messages: Arc<Mutex<VecDeque<UpdateMessage>>>,
        states: Arc<Mutex<VecDeque<SyncMessage>>>,
        completions: Arc<Mutex<Vec<Vec<OutcomeRecord>>>>,
        quits: Arc<Mutex<usize>>,
    }

    impl Tunnel for MockTunnel {
        fn send_message(&self, message: &UpdateMessage) {
            self.messages.lock().unwrap().push_back(message.clone());
        }

        fn send_state(&self, state: &SyncMessage) {
            self.states.lock().unwrap().push_back(state.clone());
        }

        fn complete(&self, outcomes: &[OutcomeRecord]) {
            self.completions.lock().unwrap().push(outcomes.to_vec());
        }

        fn quit(&self) {
            *self.quits.lock().unwrap() += 1;
        }
    }

    impl MockTunnel {
        fn results(&self) -> Vec<UpdateMessage> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|message| matches!(message, UpdateMessage::AnswersResults { .. }))
                .cloned()
                .collect()
        }

        fn completions(&self) -> Vec<Vec<OutcomeRecord>> {
            self.completions.lock().unwrap().clone()
        }

        fn quits(&self) -> usize {
            *self.quits.lock().unwrap()
        }

        fn last_message(&self) -> Option<UpdateMessage> {
            self.messages.lock().unwrap().back().cloned()
        }
    }

    struct Harness {
        run: QuizRun,
        queue: AlarmQueue<AlarmMessage>,
        tunnel: MockTunnel,
    }

    impl Harness {
        fn new(questions: Vec<Question>, mode: GameMode) -> Self {
            let run = QuizRun::new(
                questions,
                mode,
                enum_map! {
                    Player::Player1 => "Alice".to_owned(),
                    Player::Player2 => "Bob".to_owned(),
                },
            )
            .unwrap();

            Self {
                run,
                queue: AlarmQueue::new(),
                tunnel: MockTunnel::default(),
            }
        }

        fn play(&mut self) {
            let queue = &mut self.queue;
            self.run
                .play(|alarm, delay| queue.schedule(alarm, delay), &self.tunnel);
        }

        /// Delivers every alarm due up to `millis` and sets the clock there
        fn run_until(&mut self, millis: u64) {
            let until = Duration::from_millis(millis);
            while let Some((_, alarm)) = self.queue.pop_due(until) {
                let queue = &mut self.queue;
                self.run.receive_alarm(
                    alarm,
                    |alarm, delay| queue.schedule(alarm, delay),
                    &self.tunnel,
                );
            }
            self.queue.advance_to(until);
        }

        fn send(&mut self, message: IncomingMessage) {
            let queue = &mut self.queue;
            self.run.receive_message(
                message,
                |alarm, delay| queue.schedule(alarm, delay),
                &self.tunnel,
            );
        }

        fn press(&mut self, key: &str) {
            self.send(IncomingMessage::Key {
                key: key.to_owned(),
                code: None,
            });
        }
    }

    fn options(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| (*s).to_string()).collect()
    }

    fn capital() -> Question {
        Question::new("Capital of France?", options(&["Paris", "Lyon", "Nice"]), 0)
    }

    fn two_plus_two() -> Question {
        Question::new("2 + 2?", options(&["3", "4", "5", "22"]), 1)
    }

    fn planets() -> Question {
        Question::new(
            "Planets",
            options(&["Mars", "Venus", "Banana", "Saturn"]),
            2,
        )
    }

    #[test]
    fn test_scenario_normal_single_question() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.play();

        harness.run_until(1500);
        harness.press("a");
        harness.run_until(2000);
        harness.press("o");

        // Grace delay
        harness.run_until(2599);
        assert!(!harness.run.is_revealed());
        assert!(harness.tunnel.results().is_empty());

        harness.run_until(2600);
        assert!(harness.run.is_revealed());
        assert_eq!(
            harness.tunnel.last_message(),
            Some(UpdateMessage::AnswersResults {
                question: "Capital of France?".to_owned(),
                correct_index: 0,
                choices: enum_map! {
                    Player::Player1 => Some(0),
                    Player::Player2 => Some(2),
                },
                speed_winner: SpeedWinner::None,
            })
        );

        // Hold delay
        harness.run_until(4799);
        assert!(harness.tunnel.completions().is_empty());

        harness.run_until(4800);
        let completions = harness.tunnel.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(
            completions[0],
            vec![OutcomeRecord {
                question: "Capital of France?".to_owned(),
                correct_index: 0,
                player1_choice: Some(0),
                player2_choice: Some(2),
                speed_winner: SpeedWinner::None,
            }]
        );
        assert_eq!(harness.run.status(), Status::Completed);
        assert_eq!(harness.tunnel.quits(), 0);
    }

    #[test]
    fn test_scenario_speed_first_responder_wins() {
        let mut harness = Harness::new(vec![two_plus_two()], GameMode::Speed);
        harness.play();

        harness.run_until(800);
        harness.press("i");
        harness.run_until(900);
        harness.press("z");

        assert_eq!(
            harness.run.answers().first_responder(),
            Some(Player::Player2)
        );

        harness.run_until(10_000);
        let completions = harness.tunnel.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0][0].speed_winner, SpeedWinner::Player2);
        assert_eq!(completions[0][0].player1_choice, Some(1));
        assert_eq!(completions[0][0].player2_choice, Some(1));
    }

    #[test]
    fn test_speed_same_instant_goes_to_first_processed() {
        for (first_key, second_key, first_player) in [
            ("z", "i", Player::Player1),
            ("i", "z", Player::Player2),
        ] {
            let mut harness = Harness::new(vec![two_plus_two()], GameMode::Speed);
            harness.play();

            harness.run_until(500);
            harness.press(first_key);
            harness.press(second_key);

            assert_eq!(harness.run.answers().first_responder(), Some(first_player));
            assert_eq!(
                harness.run.answers().speed_rank(first_player.other()),
                Some(SpeedRank::Second)
            );

            harness.run_until(10_000);
            let completions = harness.tunnel.completions();
            assert_eq!(completions.len(), 1);
            assert_eq!(
                completions[0][0].speed_winner,
                SpeedWinner::from(Some(first_player))
            );
        }
    }

    #[test]
    fn test_number_row_answers_through_key_position() {
        let mut harness = Harness::new(vec![two_plus_two()], GameMode::Normal);
        harness.play();

        harness.send(IncomingMessage::Key {
            key: "é".to_owned(),
            code: Some("Digit2".to_owned()),
        });
        assert_eq!(harness.run.answers().choice(Player::Player2), Some(1));

        harness.send(IncomingMessage::Key {
            key: "&".to_owned(),
            code: None,
        });
        assert_eq!(harness.run.answers().choice(Player::Player1), None);
    }

    #[test]
    fn test_scenario_timer_expiry() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.play();

        harness.run_until(29_999);
        assert!(!harness.run.is_revealed());
        assert_eq!(harness.run.time_remaining(), 1);

        harness.run_until(30_000);
        assert!(harness.run.is_revealed());
        assert_eq!(harness.run.time_remaining(), 0);

        let results = harness.tunnel.results();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            UpdateMessage::AnswersResults { choices, .. }
                if choices.values().all(Option::is_none)
        ));

        harness.run_until(32_200);
        let completions = harness.tunnel.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0][0].player1_choice, None);
        assert_eq!(completions[0][0].player2_choice, None);
        assert!(!completions[0][0].is_correct(Player::Player1));
    }

    #[test]
    fn test_scenario_odd_one_out_hold_delay() {
        let mut harness = Harness::new(vec![planets(), planets()], GameMode::OddOneOut);
        harness.play();

        harness.run_until(1000);
        harness.press("e");
        harness.press("o");

        harness.run_until(1600);
        assert!(harness.run.is_revealed());

        harness.run_until(5599);
        assert_eq!(harness.run.question_index(), 0);

        harness.run_until(5600);
        assert_eq!(harness.run.question_index(), 1);
        assert!(!harness.run.is_revealed());
    }

    #[test]
    fn test_normal_hold_delay_is_shorter() {
        let mut harness = Harness::new(vec![capital(), capital()], GameMode::Normal);
        harness.play();

        harness.run_until(1000);
        harness.press("a");
        harness.press("u");

        harness.run_until(3799);
        assert_eq!(harness.run.question_index(), 0);

        harness.run_until(3800);
        assert_eq!(harness.run.question_index(), 1);
    }

    #[test]
    fn test_odd_one_out_hides_theme_until_reveal() {
        let mut harness = Harness::new(vec![planets()], GameMode::OddOneOut);
        harness.play();

        assert!(matches!(
            harness.tunnel.messages.lock().unwrap().front(),
            Some(UpdateMessage::QuestionAnnouncement {
                question: PossiblyHidden::Hidden,
                ..
            })
        ));
        assert!(matches!(
            harness.run.state_message(),
            SyncMessage::Question {
                question: PossiblyHidden::Hidden,
                ..
            }
        ));

        harness.run_until(20_000);
        assert!(matches!(
            harness.run.state_message(),
            SyncMessage::Results { question, correct_index: 2, .. } if question == "Planets"
        ));
    }

    #[test]
    fn test_every_question_gets_one_outcome() {
        let mut harness = Harness::new(
            vec![capital(), two_plus_two(), capital()],
            GameMode::Normal,
        );
        harness.play();

        harness.run_until(3 * 32_200);

        let completions = harness.tunnel.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].len(), 3);
        assert_eq!(harness.tunnel.results().len(), 3);
        assert!(harness.queue.is_empty());
    }

    #[test]
    fn test_timer_expiry_during_grace_reveals_once() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.play();

        harness.run_until(29_700);
        harness.press("a");
        harness.press("u");

        harness.run_until(30_000);
        assert!(harness.run.is_revealed());

        // The grace alarm fires at 30.3 s and must not reveal again
        harness.run_until(30_300);
        assert_eq!(harness.tunnel.results().len(), 1);

        harness.run_until(40_000);
        assert_eq!(harness.tunnel.completions().len(), 1);
    }

    #[test]
    fn test_repeated_keys_do_not_change_choice() {
        let mut harness = Harness::new(vec![two_plus_two()], GameMode::Normal);
        harness.play();

        harness.press("z");
        harness.press("a");
        harness.press("z");
        harness.press("r");

        assert_eq!(harness.run.answers().choice(Player::Player1), Some(1));
        assert_eq!(harness.run.answers().choice(Player::Player2), None);

        let answered = harness
            .tunnel
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|message| matches!(message, UpdateMessage::Answered { .. }))
            .count();
        assert_eq!(answered, 1);
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.play();

        harness.press("r");
        assert!(!harness.run.answers().has_answered(Player::Player1));

        harness.press("e");
        assert_eq!(harness.run.answers().choice(Player::Player1), Some(2));
    }

    #[test]
    fn test_late_answer_is_ignored() {
        let mut harness = Harness::new(vec![capital(), capital()], GameMode::Normal);
        harness.play();

        harness.run_until(30_000);
        assert!(harness.run.is_revealed());

        harness.press("a");
        assert_eq!(harness.run.answers().choice(Player::Player1), None);
    }

    #[test]
    fn test_pointer_choice_follows_same_rules() {
        let mut harness = Harness::new(vec![capital()], GameMode::Speed);
        harness.play();

        harness.send(IncomingMessage::Choose {
            player: Player::Player1,
            index: 0,
        });
        harness.send(IncomingMessage::Choose {
            player: Player::Player1,
            index: 1,
        });

        assert_eq!(harness.run.answers().choice(Player::Player1), Some(0));
        assert_eq!(
            harness.run.answers().first_responder(),
            Some(Player::Player1)
        );
        assert_eq!(
            harness.tunnel.last_message(),
            Some(UpdateMessage::Answered {
                player: Player::Player1,
                rank: Some(SpeedRank::First),
            })
        );
    }

    #[test]
    fn test_quit_mid_run() {
        let mut harness = Harness::new(vec![capital(), capital()], GameMode::Normal);
        harness.play();

        harness.run_until(1000);
        harness.press("a");
        harness.press("u");
        harness.send(IncomingMessage::Quit);

        assert_eq!(harness.run.status(), Status::Quit);
        assert_eq!(harness.tunnel.quits(), 1);

        // Alarms still queued are dropped
        harness.run_until(120_000);
        assert!(harness.tunnel.results().is_empty());
        assert!(harness.tunnel.completions().is_empty());
        assert!(harness.run.outcomes().is_empty());

        harness.send(IncomingMessage::Quit);
        assert_eq!(harness.tunnel.quits(), 1);
        assert_eq!(harness.run.state_message(), SyncMessage::Quit);
    }

    #[test]
    fn test_quit_before_start() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.run.quit(&harness.tunnel);
        harness.play();

        assert_eq!(harness.run.status(), Status::Quit);
        assert_eq!(harness.tunnel.quits(), 1);
        assert!(harness.queue.is_empty());
    }

    #[test]
    fn test_quit_after_completion_is_ignored() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.play();
        harness.run_until(40_000);

        harness.send(IncomingMessage::Quit);
        assert_eq!(harness.run.status(), Status::Completed);
        assert_eq!(harness.tunnel.quits(), 0);
        assert_eq!(harness.tunnel.completions().len(), 1);
    }

    #[test]
    fn test_foreign_alarm_is_dropped() {
        let mut harness = Harness::new(vec![capital()], GameMode::Normal);
        harness.play();

        harness.run.receive_alarm(
            AlarmMessage::Tick {
                run: RunId::new(),
                index: 0,
            },
            |_, _| panic!("nothing should be scheduled"),
            &harness.tunnel,
        );
        assert_eq!(harness.run.time_remaining(), 30);

        harness.run.receive_alarm(
            AlarmMessage::Advance {
                run: harness.run.id(),
                index: 0,
            },
            |_, _| panic!("nothing should be scheduled"),
            &harness.tunnel,
        );
        assert_eq!(harness.run.question_index(), 0);
    }

    #[test]
    fn test_stale_reveal_from_previous_question() {
        let mut harness = Harness::new(vec![capital(), capital()], GameMode::Normal);
        harness.play();

        harness.run_until(1000);
        harness.press("a");
        harness.press("u");
        harness.run_until(3800);
        assert_eq!(harness.run.question_index(), 1);

        harness.run.receive_alarm(
            AlarmMessage::Reveal {
                run: harness.run.id(),
                index: 0,
            },
            |_, _| panic!("nothing should be scheduled"),
            &harness.tunnel,
        );
        assert!(!harness.run.is_revealed());
    }

    #[test]
    fn test_state_messages_follow_lifecycle() {
        let mut harness = Harness::new(vec![two_plus_two()], GameMode::Speed);

        assert!(matches!(
            harness.run.state_message(),
            SyncMessage::Waiting { count: 1, mode: GameMode::Speed, .. }
        ));

        harness.play();
        harness.run_until(3000);
        harness.press("o");

        match harness.run.state_message() {
            SyncMessage::Question {
                remaining,
                answered,
                ranks,
                question,
                ..
            } => {
                assert_eq!(remaining, 12);
                assert!(answered[Player::Player2]);
                assert!(!answered[Player::Player1]);
                assert_eq!(ranks[Player::Player2], Some(SpeedRank::First));
                assert_eq!(question, PossiblyHidden::Visible("2 + 2?".to_owned()));
            }
            other => panic!("unexpected state {other:?}"),
        }

        harness.run_until(15_000);
        assert!(matches!(
            harness.run.state_message(),
            SyncMessage::Results {
                speed_winner: SpeedWinner::None,
                correct_index: 1,
                ..
            }
        ));

        harness.run_until(20_000);
        assert!(matches!(
            harness.run.state_message(),
            SyncMessage::Completed { outcomes } if outcomes.len() == 1
        ));

        harness.run.sync(&harness.tunnel);
        assert_eq!(harness.tunnel.states.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unplayable_set_cannot_start() {
        let result = QuizRun::new(
            vec![Question::new("Lonely", options(&["Only"]), 0)],
            GameMode::Normal,
            EnumMap::default(),
        );
        assert!(matches!(result, Err(question::Error::NoPlayableQuestion)));
    }

    #[test]
    fn test_message_serialization() {
        let message = UpdateMessage::QuestionAnnouncement {
            index: 0,
            count: 10,
            question: PossiblyHidden::Hidden,
            answers: options(&["a", "b"]),
            duration: Duration::from_secs(20),
        };
        let json = message.to_message();

        assert!(json.contains("QuestionAnnouncement"));
        assert!(json.contains("\"duration\":20000"));
        assert!(json.contains("Hidden"));

        let state = SyncMessage::Quit.to_message();
        assert_eq!(state, "\"Quit\"");
    }

    #[test]
    fn test_run_id_round_trip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
