//! Concrete collaborators for the chat session: the HTTP client for the
//! assistant backend and an external-process speech recognizer.

pub mod agent_sync;
pub mod speech_command;

pub use agent_sync::AgentSyncClient;
pub use speech_command::CommandRecognizer;
