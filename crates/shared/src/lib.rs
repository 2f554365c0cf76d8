pub mod notify;
pub mod settings;
pub mod speech;
pub mod transcript;

/// The remote assistant service as seen by the client.
pub mod agent_api {
    use crate::transcript::{ToolInvocation, Turn};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answer to one user query
    #[derive(Debug, Clone, PartialEq)]
    pub struct QueryReply {
        pub text: String,
        pub tool_invocations: Vec<ToolInvocation>,
    }

    impl QueryReply {
        pub fn into_turn(self) -> Turn {
            Turn::assistant(self.text).with_tools(self.tool_invocations)
        }
    }

    /// `{status, message}` body returned by the login and reset endpoints
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StatusReply {
        pub status: String,
        pub message: String,
    }

    impl StatusReply {
        pub fn is_success(&self) -> bool {
            self.status.eq_ignore_ascii_case("success")
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum RemoteError {
        #[error("request failed: {0}")]
        Transport(String),

        #[error("server returned {status}: {body}")]
        Status { status: u16, body: String },

        #[error("unexpected response body: {0}")]
        Decode(String),

        #[error("request timed out after {0:?}")]
        Timeout(Duration),
    }

    /// Request/response operations offered by the assistant backend.
    ///
    /// The service keeps the conversation history; `query` only carries the
    /// new user text.
    #[async_trait]
    pub trait RemoteService: Send + Sync {
        async fn query(&self, text: &str) -> Result<QueryReply, RemoteError>;

        /// Ask the backend to (re)establish its upstream sign-in
        async fn trigger_login(&self) -> Result<StatusReply, RemoteError>;

        async fn reset(&self) -> Result<StatusReply, RemoteError>;

        /// Prior turns, oldest first
        async fn history(&self) -> Result<Vec<Turn>, RemoteError>;
    }
}
