use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default origin for a locally running Django development server.
pub const DEFAULT_DJANGO_BASE_URL: &str = "http://127.0.0.1:8000";
/// Default origin for a locally running Flask development server.
pub const DEFAULT_FLASK_BASE_URL: &str = "http://127.0.0.1:5000";

/// The two server variants the widget talks to.
///
/// They share the request/response shapes but differ in routes, in whether a
/// session identifier travels with each message, and in history support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFlavor {
    #[default]
    Django,
    Flask,
}

impl BackendFlavor {
    pub fn chat_path(self) -> &'static str {
        match self {
            Self::Django => "/api/chat/",
            Self::Flask => "/chat",
        }
    }

    pub fn clear_path(self) -> &'static str {
        match self {
            Self::Django => "/api/clear/",
            Self::Flask => "/clear",
        }
    }

    pub fn history_path(self) -> Option<&'static str> {
        match self {
            Self::Django => Some("/api/history/"),
            Self::Flask => None,
        }
    }

    pub fn capabilities(self) -> BackendCapabilities {
        match self {
            Self::Django => BackendCapabilities {
                session_ids: true,
                history: true,
                csrf: true,
            },
            Self::Flask => BackendCapabilities {
                session_ids: false,
                history: false,
                csrf: false,
            },
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Django => DEFAULT_DJANGO_BASE_URL,
            Self::Flask => DEFAULT_FLASK_BASE_URL,
        }
    }

    /// Human-readable platform label written into history exports.
    pub fn platform_name(self) -> &'static str {
        match self {
            Self::Django => "Django ChatBot",
            Self::Flask => "ChatBot",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Django => "django",
            Self::Flask => "flask",
        }
    }
}

impl fmt::Display for BackendFlavor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// What a backend variant supports beyond the plain send/clear exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub session_ids: bool,
    pub history: bool,
    pub csrf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub flavor: BackendFlavor,
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(flavor: BackendFlavor, base_url: impl Into<String>) -> Self {
        Self {
            flavor,
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            csrf_token: None,
            timeout: None,
        }
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into().trim().to_string();
        self.csrf_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
