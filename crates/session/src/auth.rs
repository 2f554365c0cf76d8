//! Signed-in context for the chat view.
//!
//! Sign-in asks the backend to establish its upstream login (`triggerLogin`).
//! The context lives as long as the window that owns it and is passed down
//! explicitly; nothing about it is stored globally or on disk.

use shared::agent_api::{RemoteError, RemoteService, StatusReply};
use shared::notify::{Notice, Notifier};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SigningIn,
    SignedIn,
}

/// Identifies one sign-in attempt. Hand it back to
/// [`AuthSession::finish_sign_in`] with the login result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInAttempt(u64);

pub struct AuthSession {
    state: AuthState,
    /// Id of the attempt in flight; advanced by every begin and sign-out
    attempt: u64,
    notifier: Arc<dyn Notifier>,
}

impl AuthSession {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: AuthState::SignedOut,
            attempt: 0,
            notifier,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_signed_in(&self) -> bool {
        self.state == AuthState::SignedIn
    }

    /// `None` if a sign-in is already in flight or done.
    pub fn begin_sign_in(&mut self) -> Option<SignInAttempt> {
        if self.state != AuthState::SignedOut {
            return None;
        }
        self.attempt += 1;
        self.state = AuthState::SigningIn;
        Some(SignInAttempt(self.attempt))
    }

    /// Apply a login result. Results for an abandoned attempt are ignored.
    pub fn finish_sign_in(
        &mut self,
        attempt: SignInAttempt,
        result: Result<StatusReply, RemoteError>,
    ) -> bool {
        if self.state != AuthState::SigningIn || attempt.0 != self.attempt {
            tracing::debug!(attempt = attempt.0, "ignoring stale login result");
            return self.is_signed_in();
        }
        match result {
            Ok(reply) if reply.is_success() => {
                tracing::info!("signed in: {}", reply.message);
                self.state = AuthState::SignedIn;
                self.notifier
                    .notify(Notice::info("Signed In", "Your workspace is connected"));
                true
            }
            Ok(reply) => {
                tracing::warn!(status = %reply.status, "login not confirmed: {}", reply.message);
                self.state = AuthState::SignedOut;
                self.notifier
                    .notify(Notice::error("Sign-in Failed", "The server did not confirm the login"));
                false
            }
            Err(e) => {
                tracing::warn!("login request failed: {}", e);
                self.state = AuthState::SignedOut;
                self.notifier.notify(Notice::error(
                    "Sign-in Failed",
                    "Could not reach the server. Please try again.",
                ));
                false
            }
        }
    }

    pub async fn sign_in(&mut self, remote: &dyn RemoteService) -> bool {
        let Some(attempt) = self.begin_sign_in() else {
            return self.is_signed_in();
        };
        let result = remote.trigger_login().await;
        self.finish_sign_in(attempt, result)
    }

    /// Tear the session down and abandon any attempt in flight. The owner
    /// drops its chat session with it.
    pub fn sign_out(&mut self) {
        if self.state != AuthState::SignedOut {
            tracing::info!("signed out");
        }
        self.attempt += 1;
        self.state = AuthState::SignedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;
    use shared::notify::NoticeBoard;

    fn session() -> (AuthSession, Arc<NoticeBoard>) {
        let board = Arc::new(NoticeBoard::new());
        (AuthSession::new(board.clone()), board)
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let (mut auth, board) = session();
        assert_eq!(auth.state(), AuthState::SignedOut);

        assert!(auth.sign_in(&FakeRemote::new()).await);
        assert!(auth.is_signed_in());
        assert_eq!(board.snapshot()[0].title, "Signed In");

        auth.sign_out();
        assert_eq!(auth.state(), AuthState::SignedOut);
    }

    fn success() -> StatusReply {
        StatusReply {
            status: "success".into(),
            message: String::new(),
        }
    }

    #[test]
    fn test_unconfirmed_status_stays_signed_out() {
        let (mut auth, board) = session();
        let attempt = auth.begin_sign_in().unwrap();
        assert!(auth.begin_sign_in().is_none());

        let ok = auth.finish_sign_in(
            attempt,
            Ok(StatusReply {
                status: "pending".into(),
                message: "waiting for consent".into(),
            }),
        );

        assert!(!ok);
        assert_eq!(auth.state(), AuthState::SignedOut);
        assert_eq!(board.snapshot()[0].title, "Sign-in Failed");
    }

    #[test]
    fn test_transport_failure_allows_retry() {
        let (mut auth, _board) = session();
        let attempt = auth.begin_sign_in().unwrap();
        auth.finish_sign_in(
            attempt,
            Err(RemoteError::Timeout(std::time::Duration::from_secs(30))),
        );
        assert!(auth.begin_sign_in().is_some());
    }

    #[test]
    fn test_result_after_sign_out_is_ignored() {
        let (mut auth, board) = session();
        let attempt = auth.begin_sign_in().unwrap();
        auth.sign_out();

        assert!(!auth.finish_sign_in(attempt, Ok(success())));
        assert_eq!(auth.state(), AuthState::SignedOut);
        assert!(board.is_empty());
    }

    #[test]
    fn test_abandoned_attempt_does_not_settle_the_next_one() {
        let (mut auth, board) = session();
        let first = auth.begin_sign_in().unwrap();
        auth.sign_out();
        let second = auth.begin_sign_in().unwrap();

        assert!(!auth.finish_sign_in(first, Err(RemoteError::Transport("refused".into()))));
        assert_eq!(auth.state(), AuthState::SigningIn);
        assert!(board.is_empty());

        assert!(auth.finish_sign_in(second, Ok(success())));
        assert!(auth.is_signed_in());
        assert_eq!(board.snapshot()[0].title, "Signed In");
    }
}
