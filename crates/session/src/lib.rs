//! Chat session core
//!
//! - [`controller`]: transcript ownership and the send/reset lifecycle
//! - [`bootstrap`]: establishing the initial transcript
//! - [`speech`]: the voice input toggle built on a recognizer capability
//! - [`presenter`]: human-readable summaries of tool invocations
//! - [`auth`]: the signed-in context the chat view runs under

pub mod auth;
pub mod bootstrap;
pub mod controller;
pub mod presenter;
pub mod speech;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthSession, AuthState, SignInAttempt};
pub use controller::{SendOutcome, SendTicket, SessionController, SessionState};
pub use presenter::{present, ToolSummary};
pub use speech::{ListenState, SpeechChannel};
