//! # Duel Quiz Library
//!
//! This library provides the game logic of a two-player quiz played on a
//! single screen. Both players share one keyboard, each with their own key
//! zone, and race through a generated list of multiple choice questions in
//! one of three modes: Normal, Speed and Odd-One-Out.
//!
//! A [`run::QuizRun`] drives a duel from the first question to the final
//! results. It never keeps time on its own: the host schedules the
//! [`run::AlarmMessage`]s it asks for and hands them back when they fire,
//! and every message for the screen goes through a [`session::Tunnel`].
//! Around the run sit the setup form, the question source with its request
//! throttle, the final summary and the cumulative history of duels.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod alarm;
pub mod constants;
pub mod history;
pub mod input;
pub mod mode;
pub mod question;
pub mod reveal;
pub mod run;
pub mod sequencer;
pub mod session;
pub mod setup;
pub mod source;
pub mod summary;
pub mod throttle;
pub mod timer;

pub use run::{AlarmMessage, IncomingMessage, QuizRun, SyncMessage, UpdateMessage};
