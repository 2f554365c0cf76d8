//! Establishing the initial transcript from remote history.

use shared::agent_api::RemoteError;
use shared::notify::Notice;
use shared::transcript::Turn;

/// Shown when the session starts without prior history
pub const WELCOME_GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Shown after a successful reset
pub const RESTART_GREETING: &str = "Chat restarted. How can I help you today?";

pub fn welcome_turn() -> Turn {
    Turn::assistant(WELCOME_GREETING)
}

pub fn restart_turn() -> Turn {
    Turn::assistant(RESTART_GREETING)
}

/// Turn a history fetch outcome into the initial transcript.
///
/// The result is never empty. A failed fetch also yields the notice to show.
pub fn seed_transcript(fetched: Result<Vec<Turn>, RemoteError>) -> (Vec<Turn>, Option<Notice>) {
    match fetched {
        Ok(history) if !history.is_empty() => {
            tracing::info!(turns = history.len(), "restored conversation history");
            (history, None)
        }
        Ok(_) => (vec![welcome_turn()], None),
        Err(e) => {
            tracing::warn!("failed to load conversation history: {}", e);
            (
                vec![welcome_turn()],
                Some(Notice::error("Error", "Failed to load conversation history")),
            )
        }
    }
}
