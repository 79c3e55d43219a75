//! Boundary between a run and the session hosting it
//!
//! The run never renders anything and never decides what happens after
//! it ends. It pushes view updates through a [`Tunnel`] and reports its
//! end exactly once: either the full list of outcomes, or a quit signal.

use crate::{
    run::{SyncMessage, UpdateMessage},
    sequencer::OutcomeRecord,
};

/// Trait for sending messages out of a run
///
/// Implementations might drive a terminal view, a web page over a
/// WebSocket, or simply record what they receive.
pub trait Tunnel {
    /// Sends an incremental view update
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full snapshot of the run
    ///
    /// Used when a view attaches, or re-attaches, in the middle of a run.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to send
    fn send_state(&self, state: &SyncMessage);

    /// Receives the outcomes of a run that played every question
    ///
    /// Called at most once per run, never together with [`Tunnel::quit`].
    fn complete(&self, outcomes: &[OutcomeRecord]);

    /// Signals that the run was abandoned
    ///
    /// Called at most once per run, never together with
    /// [`Tunnel::complete`].
    fn quit(&self);
}
