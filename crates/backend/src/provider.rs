use chatbot_storage::SessionId;
use futures::future::BoxFuture;
use serde::Deserialize;
use snafu::Snafu;

use super::flavor::{BackendCapabilities, BackendFlavor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<SessionId>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Successful chat reply. Only `response` is required by the contract.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            session_id: None,
            timestamp: None,
        }
    }
}

/// One server-side turn replayed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub user_message: String,
    pub bot_response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned status {status}: {message}"))]
    Status {
        stage: &'static str,
        endpoint: String,
        status: u16,
        message: String,
    },
    #[snafu(display("failed to decode response from {endpoint} on `{stage}`: {source}"))]
    DecodeBody {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("{flavor} backend does not support {operation}"))]
    Unsupported {
        stage: &'static str,
        flavor: BackendFlavor,
        operation: &'static str,
    },
}

impl BackendError {
    /// HTTP status for server-side rejections, `None` when the request never completed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Remote chat service consumed by the client.
pub trait ChatBackend: Send + Sync {
    fn flavor(&self) -> BackendFlavor;

    fn capabilities(&self) -> BackendCapabilities {
        self.flavor().capabilities()
    }

    fn send_message<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<ChatReply>>;

    /// Asks the server to discard state for `session_id`.
    fn clear_session<'a>(
        &'a self,
        session_id: Option<SessionId>,
    ) -> BoxFuture<'a, BackendResult<()>>;

    fn load_history<'a>(
        &'a self,
        session_id: Option<SessionId>,
    ) -> BoxFuture<'a, BackendResult<Vec<HistoryEntry>>>;
}
