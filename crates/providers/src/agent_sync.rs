use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::agent_api::{QueryReply, RemoteError, RemoteService, StatusReply};
use shared::settings::ClientSettings;
use shared::transcript::{Speaker, ToolInvocation, Turn};
use std::time::Duration;
use url::Url;

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    response_text: Option<String>,
    #[serde(default)]
    function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    function_name: String,
    #[serde(default)]
    parameters: serde_json::Value,
}

impl From<FunctionCall> for ToolInvocation {
    fn from(call: FunctionCall) -> Self {
        ToolInvocation::from_json(call.function_name, call.parameters)
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_calls: Option<Vec<FunctionCall>>,
}

impl WireMessage {
    fn into_turn(self) -> Option<Turn> {
        let speaker = match self.role.as_str() {
            "user" => Speaker::User,
            "assistant" => Speaker::Assistant,
            other => {
                tracing::debug!(role = other, "skipping history entry with unknown role");
                return None;
            }
        };
        let text = self.content.unwrap_or_default();
        let tools = match speaker {
            Speaker::User => Vec::new(),
            Speaker::Assistant => self
                .function_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolInvocation::from)
                .collect(),
        };
        Some(Turn {
            speaker,
            text,
            tool_invocations: tools,
        })
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// HTTP client for the assistant backend (`/query`, `/ping`, `/reset`,
/// `/messages`).
pub struct AgentSyncClient {
    http: Client,
    base: Url,
    timeout: Duration,
}

impl AgentSyncClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())
            .with_context(|| format!("invalid API base URL: {base_url}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("API base URL cannot carry paths: {base_url}"));
        }
        // Url::join drops the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base,
            timeout,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        Self::new(&settings.api_base_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|e| RemoteError::Transport(format!("bad endpoint {path}: {e}")))
    }

    fn classify(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = req.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>().await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl RemoteService for AgentSyncClient {
    async fn query(&self, text: &str) -> Result<QueryReply, RemoteError> {
        let url = self.endpoint("query")?;
        let body: QueryResponse = self.fetch(self.http.get(url).query(&[("q", text)])).await?;
        Ok(QueryReply {
            text: body.response_text.unwrap_or_default(),
            tool_invocations: body
                .function_calls
                .into_iter()
                .map(ToolInvocation::from)
                .collect(),
        })
    }

    async fn trigger_login(&self) -> Result<StatusReply, RemoteError> {
        let url = self.endpoint("ping")?;
        let body: StatusResponse = self.fetch(self.http.get(url)).await?;
        Ok(StatusReply {
            status: body.status,
            message: body.message,
        })
    }

    async fn reset(&self) -> Result<StatusReply, RemoteError> {
        let url = self.endpoint("reset")?;
        let body: StatusResponse = self.fetch(self.http.post(url)).await?;
        Ok(StatusReply {
            status: body.status,
            message: body.message,
        })
    }

    async fn history(&self) -> Result<Vec<Turn>, RemoteError> {
        let url = self.endpoint("messages")?;
        let body: MessagesResponse = self.fetch(self.http.get(url)).await?;
        Ok(body
            .messages
            .into_iter()
            .filter_map(WireMessage::into_turn)
            .collect())
    }
}
