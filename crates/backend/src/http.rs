use chatbot_storage::SessionId;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use super::flavor::{BackendConfig, BackendFlavor};
use super::provider::{
    BackendResult, BuildClientSnafu, ChatBackend, ChatReply, ChatRequest, DecodeBodySnafu,
    HistoryEntry, StatusSnafu, TransportSnafu, UnsupportedSnafu,
};

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClearBody {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    messages: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP adapter for both server flavors.
///
/// The cookie store is enabled so a server-side session cookie is replayed the
/// way a browser would.
pub struct HttpBackend {
    config: BackendConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(BuildClientSnafu {
            stage: "build-http-client",
        })?;

        Ok(Self { config, client })
    }

    fn with_csrf(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.csrf_token {
            Some(token) if self.config.flavor.capabilities().csrf => {
                request.header(CSRF_HEADER, token)
            }
            _ => request,
        }
    }

    fn wire_session_id(&self, session_id: Option<SessionId>) -> Option<String> {
        if self.config.flavor.capabilities().session_ids {
            session_id.map(|id| id.to_string())
        } else {
            None
        }
    }

    async fn post_chat(&self, request: ChatRequest) -> BackendResult<ChatReply> {
        let endpoint = self.config.endpoint(self.config.flavor.chat_path());
        let body = ChatBody {
            message: &request.message,
            session_id: self.wire_session_id(request.session_id),
        };

        tracing::debug!(
            endpoint = %endpoint,
            has_session_id = body.session_id.is_some(),
            message_chars = request.message.chars().count(),
            "sending chat message"
        );

        let response = self
            .with_csrf(self.client.post(&endpoint))
            .json(&body)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-chat-request",
                endpoint: endpoint.clone(),
            })?;
        let response = ensure_success(response, &endpoint, "chat-http-status").await?;

        response.json::<ChatReply>().await.context(DecodeBodySnafu {
            stage: "decode-chat-reply",
            endpoint,
        })
    }

    async fn post_clear(&self, session_id: Option<SessionId>) -> BackendResult<()> {
        let endpoint = self.config.endpoint(self.config.flavor.clear_path());
        let mut request = self.with_csrf(self.client.post(&endpoint));
        if let Some(session_id) = self.wire_session_id(session_id) {
            request = request.json(&ClearBody { session_id });
        }

        let response = request.send().await.context(TransportSnafu {
            stage: "send-clear-request",
            endpoint: endpoint.clone(),
        })?;
        ensure_success(response, &endpoint, "clear-http-status").await?;

        tracing::debug!(endpoint = %endpoint, "server-side session cleared");
        Ok(())
    }

    async fn get_history(&self, session_id: Option<SessionId>) -> BackendResult<Vec<HistoryEntry>> {
        let Some(path) = self.config.flavor.history_path() else {
            return UnsupportedSnafu {
                stage: "resolve-history-path",
                flavor: self.config.flavor,
                operation: "history",
            }
            .fail();
        };

        let endpoint = self.config.endpoint(path);
        let mut request = self.with_csrf(self.client.get(&endpoint));
        if let Some(session_id) = self.wire_session_id(session_id) {
            request = request.query(&[("session_id", session_id)]);
        }

        let response = request.send().await.context(TransportSnafu {
            stage: "send-history-request",
            endpoint: endpoint.clone(),
        })?;
        let response = ensure_success(response, &endpoint, "history-http-status").await?;

        let body = response.json::<HistoryBody>().await.context(DecodeBodySnafu {
            stage: "decode-history",
            endpoint,
        })?;
        Ok(body.messages)
    }
}

impl ChatBackend for HttpBackend {
    fn flavor(&self) -> BackendFlavor {
        self.config.flavor
    }

    fn send_message<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<ChatReply>> {
        self.post_chat(request).boxed()
    }

    fn clear_session<'a>(
        &'a self,
        session_id: Option<SessionId>,
    ) -> BoxFuture<'a, BackendResult<()>> {
        self.post_clear(session_id).boxed()
    }

    fn load_history<'a>(
        &'a self,
        session_id: Option<SessionId>,
    ) -> BoxFuture<'a, BackendResult<Vec<HistoryEntry>>> {
        self.get_history(session_id).boxed()
    }
}

/// Turns a non-2xx response into `BackendError::Status`, preferring the server's
/// `{ "error": ... }` message when one is present.
async fn ensure_success(
    response: Response,
    endpoint: &str,
    stage: &'static str,
) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let payload = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&payload)
        .ok()
        .and_then(|body| body.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));

    tracing::warn!(
        endpoint = %endpoint,
        status = status.as_u16(),
        message = %message,
        "backend rejected request"
    );

    StatusSnafu {
        stage,
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message,
    }
    .fail()
}
