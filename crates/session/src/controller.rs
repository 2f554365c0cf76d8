//! Session controller
//!
//! Owns the transcript and drives one request at a time against the remote
//! assistant. A send appends the user turn optimistically and either extends
//! the transcript with the answer or rolls the user turn back.
//!
//! Every operation comes in two forms. The awaitable ones (`submit_send`,
//! `reset`, `bootstrap`) make the remote call themselves. The begin/finish
//! pairs let an event loop hand the remote call to a background runtime and
//! feed the result back later.

use crate::bootstrap::{restart_turn, seed_transcript};
use shared::agent_api::{QueryReply, RemoteError, RemoteService, StatusReply};
use shared::notify::{Notice, Notifier};
use shared::transcript::Turn;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on every remote call
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub transcript: Vec<Turn>,
    /// A send is in flight
    pub pending: bool,
    /// The initial transcript has been established
    pub bootstrapped: bool,
}

/// Proof that a send was accepted. Hand it back to
/// [`SessionController::finish_send`] with the remote result.
#[derive(Debug)]
pub struct SendTicket {
    text: String,
    epoch: u64,
    rollback_len: usize,
}

impl SendTicket {
    /// The text to send to the remote service
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, or another send was in flight
    Ignored,
    /// The assistant answered and the transcript grew by two turns
    Delivered,
    /// The call failed and the user turn was removed
    RolledBack,
    /// The result belonged to a transcript that has since been reset
    Discarded,
}

pub struct SessionController {
    state: SessionState,
    /// Advanced on every successful reset
    epoch: u64,
    resetting: bool,
    deadline: Duration,
    notifier: Arc<dyn Notifier>,
}

/// Run a remote call, failing with [`RemoteError::Timeout`] after `deadline`.
pub async fn bounded<T, F>(deadline: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(deadline)),
    }
}

impl SessionController {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: SessionState::default(),
            epoch: 0,
            resetting: false,
            deadline: DEFAULT_DEADLINE,
            notifier,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.state.transcript
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.state.bootstrapped
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    // ── Send ─────────────────────────────────────────────────────────

    /// Accept a user message: append it and mark the session pending.
    ///
    /// Returns `None` for blank input or while another send is in flight.
    /// Callers must not send before the session is bootstrapped.
    pub fn begin_send(&mut self, text: &str) -> Option<SendTicket> {
        if text.trim().is_empty() {
            return None;
        }
        if self.state.pending {
            tracing::debug!("send ignored: a request is already in flight");
            return None;
        }

        let rollback_len = self.state.transcript.len();
        self.state.transcript.push(Turn::user(text));
        self.state.pending = true;
        Some(SendTicket {
            text: text.to_string(),
            epoch: self.epoch,
            rollback_len,
        })
    }

    /// Apply the remote result of an accepted send.
    pub fn finish_send(
        &mut self,
        ticket: SendTicket,
        result: Result<QueryReply, RemoteError>,
    ) -> SendOutcome {
        self.state.pending = false;

        if ticket.epoch != self.epoch {
            tracing::info!("dropping reply for a conversation that was reset");
            return SendOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                tracing::debug!(tools = reply.tool_invocations.len(), "assistant replied");
                self.state.transcript.push(reply.into_turn());
                SendOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!("query failed: {}", e);
                self.state.transcript.truncate(ticket.rollback_len);
                self.notifier.notify(Notice::error(
                    "Error",
                    "Failed to send message. Please try again.",
                ));
                SendOutcome::RolledBack
            }
        }
    }

    /// Send `text` and wait for the assistant's answer.
    pub async fn submit_send(&mut self, remote: &dyn RemoteService, text: &str) -> SendOutcome {
        let Some(ticket) = self.begin_send(text) else {
            return SendOutcome::Ignored;
        };
        let result = bounded(self.deadline, remote.query(ticket.text())).await;
        self.finish_send(ticket, result)
    }

    // ── Reset ────────────────────────────────────────────────────────

    /// Returns false when a reset is already in flight.
    pub fn begin_reset(&mut self) -> bool {
        if self.resetting {
            return false;
        }
        self.resetting = true;
        true
    }

    /// Returns true when the transcript was replaced.
    pub fn finish_reset(&mut self, result: Result<StatusReply, RemoteError>) -> bool {
        self.resetting = false;
        match result {
            Ok(_) => {
                self.epoch += 1;
                self.state.transcript = vec![restart_turn()];
                self.notifier.notify(Notice::info(
                    "Chat Restarted",
                    "Your conversation has been reset",
                ));
                true
            }
            Err(e) => {
                tracing::warn!("reset failed: {}", e);
                self.notifier.notify(Notice::error(
                    "Error",
                    "Failed to reset conversation. Please try again.",
                ));
                false
            }
        }
    }

    pub async fn reset(&mut self, remote: &dyn RemoteService) -> bool {
        if !self.begin_reset() {
            return false;
        }
        let result = bounded(self.deadline, remote.reset()).await;
        self.finish_reset(result)
    }

    // ── Bootstrap ────────────────────────────────────────────────────

    /// Install the initial transcript. Only the first call has an effect.
    pub fn finish_bootstrap(&mut self, fetched: Result<Vec<Turn>, RemoteError>) {
        if self.state.bootstrapped {
            tracing::debug!("bootstrap ignored: session already initialized");
            return;
        }
        let (transcript, notice) = seed_transcript(fetched);
        self.state.transcript = transcript;
        if let Some(notice) = notice {
            self.notifier.notify(notice);
        }
        self.state.bootstrapped = true;
    }

    pub async fn bootstrap(&mut self, remote: &dyn RemoteService) {
        if self.state.bootstrapped {
            return;
        }
        let fetched = bounded(self.deadline, remote.history()).await;
        self.finish_bootstrap(fetched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{RESTART_GREETING, WELCOME_GREETING};
    use crate::presenter::present;
    use crate::testing::{weather_reply, FakeRemote};
    use shared::notify::{NoticeBoard, Severity};
    use shared::transcript::Speaker;

    fn controller() -> (SessionController, Arc<NoticeBoard>) {
        let board = Arc::new(NoticeBoard::new());
        (SessionController::new(board.clone()), board)
    }

    async fn booted(remote: &FakeRemote) -> (SessionController, Arc<NoticeBoard>) {
        let (mut ctl, board) = controller();
        ctl.bootstrap(remote).await;
        (ctl, board)
    }

    #[tokio::test]
    async fn test_successful_send_adds_two_turns() {
        let remote = FakeRemote::new();
        let (mut ctl, board) = booted(&remote).await;
        remote.push_query(Ok(QueryReply {
            text: "Hi there".into(),
            tool_invocations: Vec::new(),
        }));
        let before = ctl.transcript().len();

        let outcome = ctl.submit_send(&remote, "hello").await;

        assert_eq!(outcome, SendOutcome::Delivered);
        assert_eq!(ctl.transcript().len(), before + 2);
        assert_eq!(ctl.transcript()[before], Turn::user("hello"));
        assert_eq!(ctl.transcript()[before + 1], Turn::assistant("Hi there"));
        assert!(!ctl.is_pending());
        assert!(board.is_empty());
        assert_eq!(remote.queries(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_weather_scenario_renders_tool_summary() {
        let remote = FakeRemote::new();
        let (mut ctl, _board) = booted(&remote).await;
        remote.push_query(Ok(weather_reply()));

        ctl.submit_send(&remote, "What's the weather?").await;

        let last = ctl.transcript().last().unwrap();
        assert_eq!(last.speaker, Speaker::Assistant);
        assert_eq!(last.text, "It's sunny");
        let summary = present(&last.tool_invocations).unwrap();
        assert_eq!(summary.label, "1 tool used");
        assert_eq!(summary.calls[0].name, "get_weather");
        assert_eq!(summary.calls[0].parameters[0].to_string(), "location: current");
    }

    #[tokio::test]
    async fn test_failed_send_rolls_back() {
        let remote = FakeRemote::new();
        let (mut ctl, board) = booted(&remote).await;
        remote.push_query(Err(RemoteError::Status {
            status: 502,
            body: "bad gateway".into(),
        }));
        let before = ctl.transcript().to_vec();

        let outcome = ctl.submit_send(&remote, "hello").await;

        assert_eq!(outcome, SendOutcome::RolledBack);
        assert_eq!(ctl.transcript(), before.as_slice());
        assert!(!ctl.transcript().iter().any(|t| t.text == "hello"));
        assert!(!ctl.is_pending());
        let notices = board.snapshot();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert_eq!(notices[0].description, "Failed to send message. Please try again.");
    }

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let remote = FakeRemote::new();
        let (mut ctl, board) = booted(&remote).await;
        let before = ctl.state().clone();

        for text in ["", "   ", "\n\t "] {
            assert_eq!(ctl.submit_send(&remote, text).await, SendOutcome::Ignored);
        }

        assert_eq!(ctl.state(), &before);
        assert!(remote.queries().is_empty());
        assert!(board.is_empty());
    }

    #[tokio::test]
    async fn test_send_while_pending_is_ignored() {
        let remote = FakeRemote::new();
        let (mut ctl, _board) = booted(&remote).await;

        let ticket = ctl.begin_send("first").unwrap();
        let during = ctl.transcript().to_vec();

        assert_eq!(ctl.submit_send(&remote, "second").await, SendOutcome::Ignored);
        assert!(ctl.begin_send("third").is_none());
        assert_eq!(ctl.transcript(), during.as_slice());
        assert!(remote.queries().is_empty());

        assert_eq!(
            ctl.finish_send(ticket, Ok(QueryReply {
                text: "ok".into(),
                tool_invocations: Vec::new()
            })),
            SendOutcome::Delivered
        );
        assert!(!ctl.is_pending());
    }

    #[test]
    fn test_optimistic_append_is_visible_before_reply() {
        let (mut ctl, _board) = controller();
        ctl.finish_bootstrap(Ok(Vec::new()));

        let ticket = ctl.begin_send("  keep my spacing ").unwrap();

        assert!(ctl.is_pending());
        assert_eq!(ticket.text(), "  keep my spacing ");
        assert_eq!(ctl.transcript().last(), Some(&Turn::user("  keep my spacing ")));
    }

    #[tokio::test]
    async fn test_hung_query_times_out_and_rolls_back() {
        let remote = FakeRemote::new().hang_queries();
        let (ctl, board) = booted(&remote).await;
        let mut ctl = ctl.with_deadline(Duration::from_millis(20));

        let outcome = ctl.submit_send(&remote, "hello").await;

        assert_eq!(outcome, SendOutcome::RolledBack);
        assert!(!ctl.is_pending());
        assert_eq!(board.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_replaces_transcript_with_greeting() {
        let remote = FakeRemote::new().with_history(vec![
            Turn::user("a"),
            Turn::assistant("b"),
            Turn::user("c"),
            Turn::assistant("d"),
        ]);
        let (mut ctl, board) = booted(&remote).await;
        assert_eq!(ctl.transcript().len(), 4);

        assert!(ctl.reset(&remote).await);

        assert_eq!(ctl.transcript(), &[Turn::assistant(RESTART_GREETING)]);
        assert_eq!(remote.reset_calls(), 1);
        let notices = board.snapshot();
        assert_eq!(notices[0].title, "Chat Restarted");
        assert_eq!(notices[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_transcript() {
        let remote = FakeRemote::new();
        let (mut ctl, board) = booted(&remote).await;
        remote.push_query(Ok(weather_reply()));
        ctl.submit_send(&remote, "What's the weather?").await;
        let before = ctl.transcript().to_vec();

        remote.fail_next_reset();
        assert!(!ctl.reset(&remote).await);

        assert_eq!(ctl.transcript(), before.as_slice());
        assert!(!ctl.is_resetting());
        assert_eq!(
            board.snapshot().last().map(|n| n.description.clone()),
            Some("Failed to reset conversation. Please try again.".to_string())
        );

        // retry succeeds
        assert!(ctl.reset(&remote).await);
        assert_eq!(ctl.transcript().len(), 1);
    }

    #[test]
    fn test_overlapping_reset_is_refused() {
        let (mut ctl, _board) = controller();
        assert!(ctl.begin_reset());
        assert!(!ctl.begin_reset());
        ctl.finish_reset(Ok(StatusReply {
            status: "success".into(),
            message: "Messages cleared".into(),
        }));
        assert!(ctl.begin_reset());
    }

    #[test]
    fn test_reply_after_reset_is_discarded() {
        let (mut ctl, _board) = controller();
        ctl.finish_bootstrap(Ok(Vec::new()));

        let ticket = ctl.begin_send("hello").unwrap();
        assert!(ctl.begin_reset());
        ctl.finish_reset(Ok(StatusReply {
            status: "success".into(),
            message: String::new(),
        }));

        let outcome = ctl.finish_send(ticket, Err(RemoteError::Transport("reset".into())));

        assert_eq!(outcome, SendOutcome::Discarded);
        assert_eq!(ctl.transcript(), &[Turn::assistant(RESTART_GREETING)]);
        assert!(!ctl.is_pending());
    }

    #[tokio::test]
    async fn test_bootstrap_uses_history_verbatim() {
        let history = vec![Turn::user("find Bob"), Turn::assistant("Bob is bob@corp")];
        let remote = FakeRemote::new().with_history(history.clone());

        let (ctl, board) = booted(&remote).await;

        assert!(ctl.is_bootstrapped());
        assert_eq!(ctl.transcript(), history.as_slice());
        assert!(board.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_empty_history_seeds_greeting() {
        let remote = FakeRemote::new();
        let (ctl, board) = booted(&remote).await;

        assert!(ctl.is_bootstrapped());
        assert_eq!(ctl.transcript(), &[Turn::assistant(WELCOME_GREETING)]);
        assert!(board.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_failure_seeds_greeting_and_notifies() {
        let remote = FakeRemote::new().fail_history();
        let (ctl, board) = booted(&remote).await;

        assert!(ctl.is_bootstrapped());
        assert_eq!(ctl.transcript(), &[Turn::assistant(WELCOME_GREETING)]);
        assert_eq!(board.snapshot()[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_second_bootstrap_is_ignored() {
        let remote = FakeRemote::new();
        let (mut ctl, _board) = booted(&remote).await;
        remote.push_query(Ok(weather_reply()));
        ctl.submit_send(&remote, "What's the weather?").await;

        ctl.finish_bootstrap(Ok(vec![Turn::user("stale")]));
        ctl.bootstrap(&remote).await;

        assert_eq!(ctl.transcript().len(), 3);
        assert_eq!(remote.history_calls(), 1);
    }

    #[tokio::test]
    async fn test_bounded_passes_results_through() {
        let ok: Result<u8, RemoteError> = bounded(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let slow = bounded(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<u8, RemoteError>(1)
        })
        .await;
        assert_eq!(slow, Err(RemoteError::Timeout(Duration::from_millis(5))));
    }
}
