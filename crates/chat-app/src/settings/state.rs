use std::path::{Path, PathBuf};
use std::time::Duration;

use chatbot_backend::{BackendConfig, BackendFlavor};
use chatbot_storage::{DJANGO_KEY_PREFIX, StorageKeys};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::chat::{ElementBindings, MarkupPolicy};

pub const SETTINGS_DIRECTORY_NAME: &str = "chatbot";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const STATE_FILE_NAME: &str = "state.json";
/// Environment variable that points at an alternative settings file.
pub const CONFIG_PATH_ENV: &str = "CHATBOT_CONFIG";
pub const ENV_PREFIX: &str = "CHATBOT_";
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hello! I'm your virtual assistant. How can I help you today?";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub flavor: BackendFlavor,
    /// Server origin; blank means the flavor's local development default.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Local-store key prefix; `None` picks the flavor's historical prefix.
    #[serde(default)]
    pub storage_prefix: Option<String>,
    #[serde(default)]
    pub state_path: Option<PathBuf>,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    #[serde(default)]
    pub markup: Option<MarkupPolicy>,
    #[serde(default)]
    pub bindings: ElementBindings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            flavor: BackendFlavor::default(),
            base_url: String::new(),
            csrf_token: String::new(),
            request_timeout_secs: None,
            storage_prefix: None,
            state_path: None,
            export_dir: default_export_dir(),
            max_message_chars: default_max_message_chars(),
            welcome_message: default_welcome_message(),
            markup: None,
            bindings: ElementBindings::default(),
        }
    }
}

impl ClientSettings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".chatbot"))
    }

    pub fn default_config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::default_config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Loads defaults, then the JSON file (if present), then `CHATBOT_*` variables.
    ///
    /// A malformed source never aborts startup; the widget falls back to defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]));

        match figment.extract::<Self>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Self::default().normalized()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.base_url = if self.base_url.trim().is_empty() {
            self.flavor.default_base_url().to_string()
        } else {
            self.base_url.trim().trim_end_matches('/').to_string()
        };
        self.csrf_token = self.csrf_token.trim().to_string();
        self.storage_prefix = self
            .storage_prefix
            .map(|prefix| prefix.trim().to_string());
        self.max_message_chars = self.max_message_chars.max(1);
        if self.welcome_message.trim().is_empty() {
            self.welcome_message = default_welcome_message();
        }
        self.request_timeout_secs = self.request_timeout_secs.filter(|secs| *secs > 0);

        self
    }

    pub fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(self.flavor, &self.base_url);
        if !self.csrf_token.is_empty() {
            config = config.with_csrf_token(&self.csrf_token);
        }
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    pub fn key_prefix(&self) -> &str {
        match (&self.storage_prefix, self.flavor) {
            (Some(prefix), _) => prefix.as_str(),
            (None, BackendFlavor::Django) => DJANGO_KEY_PREFIX,
            (None, BackendFlavor::Flask) => "",
        }
    }

    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(self.key_prefix())
    }

    pub fn markup_policy(&self) -> MarkupPolicy {
        self.markup
            .unwrap_or_else(|| MarkupPolicy::for_flavor(self.flavor))
    }

    pub fn resolved_state_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
                .unwrap_or_else(|| PathBuf::from(".chatbot"))
                .join(STATE_FILE_NAME)
        })
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_message_chars() -> usize {
    DEFAULT_MAX_MESSAGE_CHARS
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_flavor_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ClientSettings::load(&dir.path().join("absent.json"));

        assert_eq!(settings.flavor, BackendFlavor::Django);
        assert_eq!(settings.base_url, chatbot_backend::DEFAULT_DJANGO_BASE_URL);
        assert_eq!(settings.key_prefix(), "django-");
        assert_eq!(settings.markup_policy(), MarkupPolicy::Rich);
        assert_eq!(settings.max_message_chars, DEFAULT_MAX_MESSAGE_CHARS);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "flavor": "flask",
                "base_url": "http://chat.internal:5000/",
                "max_message_chars": 0,
                "bindings": { "messages": "log" }
            }"#,
        )
        .unwrap();

        let settings = ClientSettings::load(&path);

        assert_eq!(settings.flavor, BackendFlavor::Flask);
        assert_eq!(settings.base_url, "http://chat.internal:5000");
        assert_eq!(settings.key_prefix(), "");
        assert_eq!(settings.markup_policy(), MarkupPolicy::Plain);
        assert_eq!(settings.max_message_chars, 1);
        assert_eq!(settings.bindings.messages, "log");
        assert_eq!(settings.bindings.input, "messageInput");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "flavor": "rails" }"#).unwrap();

        let settings = ClientSettings::load(&path);
        assert_eq!(settings, ClientSettings::default().normalized());
    }

    #[test]
    fn backend_config_carries_csrf_and_timeout() {
        let settings = ClientSettings {
            csrf_token: " abc ".to_string(),
            request_timeout_secs: Some(15),
            ..ClientSettings::default()
        }
        .normalized();

        let config = settings.backend_config();
        assert_eq!(config.csrf_token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
    }
}
