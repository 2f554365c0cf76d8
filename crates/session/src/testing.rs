//! In-memory fakes shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::agent_api::{QueryReply, RemoteError, RemoteService, StatusReply};
use shared::transcript::{ToolInvocation, Turn};
use std::collections::VecDeque;

pub(crate) fn weather_reply() -> QueryReply {
    QueryReply {
        text: "It's sunny".into(),
        tool_invocations: vec![ToolInvocation::new("get_weather").with_arg("location", "current")],
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<QueryReply, RemoteError>>,
    queries: Vec<String>,
    history: Option<Vec<Turn>>,
    history_calls: usize,
    reset_calls: usize,
    fail_next_reset: bool,
    hang_queries: bool,
}

/// Scripted [`RemoteService`]. Unscripted queries echo their input.
pub(crate) struct FakeRemote {
    script: Mutex<Script>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        let script = Script {
            history: Some(Vec::new()),
            ..Default::default()
        };
        Self {
            script: Mutex::new(script),
        }
    }

    pub(crate) fn with_history(self, history: Vec<Turn>) -> Self {
        self.script.lock().history = Some(history);
        self
    }

    pub(crate) fn fail_history(self) -> Self {
        self.script.lock().history = None;
        self
    }

    pub(crate) fn hang_queries(self) -> Self {
        self.script.lock().hang_queries = true;
        self
    }

    pub(crate) fn push_query(&self, reply: Result<QueryReply, RemoteError>) {
        self.script.lock().replies.push_back(reply);
    }

    pub(crate) fn fail_next_reset(&self) {
        self.script.lock().fail_next_reset = true;
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.script.lock().queries.clone()
    }

    pub(crate) fn reset_calls(&self) -> usize {
        self.script.lock().reset_calls
    }

    pub(crate) fn history_calls(&self) -> usize {
        self.script.lock().history_calls
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn query(&self, text: &str) -> Result<QueryReply, RemoteError> {
        let (hang, scripted) = {
            let mut script = self.script.lock();
            script.queries.push(text.to_string());
            (script.hang_queries, script.replies.pop_front())
        };
        if hang {
            std::future::pending::<()>().await;
        }
        scripted.unwrap_or_else(|| {
            Ok(QueryReply {
                text: format!("echo: {text}"),
                tool_invocations: Vec::new(),
            })
        })
    }

    async fn trigger_login(&self) -> Result<StatusReply, RemoteError> {
        Ok(StatusReply {
            status: "success".into(),
            message: "Server login confirmed.".into(),
        })
    }

    async fn reset(&self) -> Result<StatusReply, RemoteError> {
        let mut script = self.script.lock();
        script.reset_calls += 1;
        if std::mem::take(&mut script.fail_next_reset) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        Ok(StatusReply {
            status: "success".into(),
            message: "Messages cleared".into(),
        })
    }

    async fn history(&self) -> Result<Vec<Turn>, RemoteError> {
        let mut script = self.script.lock();
        script.history_calls += 1;
        script
            .history
            .clone()
            .ok_or_else(|| RemoteError::Transport("connection refused".into()))
    }
}
