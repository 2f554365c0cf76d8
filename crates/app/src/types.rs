//! Core types for the AgentSync app
//!
//! Messages passed from the background runtime back to the UI thread.

use session::{SendTicket, SignInAttempt};
use shared::agent_api::{QueryReply, RemoteError, StatusReply};
use shared::transcript::Turn;

/// Result of one background remote call
#[derive(Debug)]
pub enum RemoteEvent {
    Login(SignInAttempt, Result<StatusReply, RemoteError>),
    History(Result<Vec<Turn>, RemoteError>),
    Query(SendTicket, Result<QueryReply, RemoteError>),
    Reset(Result<StatusReply, RemoteError>),
}

/// A [`RemoteEvent`] tagged with the chat session that asked for it.
///
/// Login events use chat id 0, which no chat session ever has.
#[derive(Debug)]
pub struct Envelope {
    pub chat: u64,
    pub event: RemoteEvent,
}

/// Current app screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Login,
    Loading,
    Chat,
}
