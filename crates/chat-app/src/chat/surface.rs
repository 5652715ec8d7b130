use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::chat::message::{Notification, RenderedMessage};
use crate::chat::message_input::CharCounter;
use crate::error::{ClientResult, MissingElementSnafu};
use crate::settings::ThemeMode;

/// Controls the client needs to find on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    Messages,
    Input,
    SendButton,
    ClearButton,
    ExportButton,
    ThemeToggle,
    TypingIndicator,
    CharCounter,
    Notifications,
}

impl ElementRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Input => "input",
            Self::SendButton => "send_button",
            Self::ClearButton => "clear_button",
            Self::ExportButton => "export_button",
            Self::ThemeToggle => "theme_toggle",
            Self::TypingIndicator => "typing_indicator",
            Self::CharCounter => "char_counter",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for ElementRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Element ids the client binds to, keyed by role.
///
/// Every role except the export button is required; a surface without export
/// support leaves `export_button` unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementBindings {
    pub messages: String,
    pub input: String,
    pub send_button: String,
    pub clear_button: String,
    pub export_button: Option<String>,
    pub theme_toggle: String,
    pub typing_indicator: String,
    pub char_counter: String,
    pub notifications: String,
}

impl Default for ElementBindings {
    fn default() -> Self {
        Self {
            messages: "chatMessages".to_string(),
            input: "messageInput".to_string(),
            send_button: "sendButton".to_string(),
            clear_button: "clearChat".to_string(),
            export_button: Some("exportHistory".to_string()),
            theme_toggle: "toggleTheme".to_string(),
            typing_indicator: "typingIndicator".to_string(),
            char_counter: "charCounter".to_string(),
            notifications: "notificationsContainer".to_string(),
        }
    }
}

impl ElementBindings {
    pub fn required(&self) -> [(ElementRole, &str); 8] {
        [
            (ElementRole::Messages, self.messages.as_str()),
            (ElementRole::Input, self.input.as_str()),
            (ElementRole::SendButton, self.send_button.as_str()),
            (ElementRole::ClearButton, self.clear_button.as_str()),
            (ElementRole::ThemeToggle, self.theme_toggle.as_str()),
            (ElementRole::TypingIndicator, self.typing_indicator.as_str()),
            (ElementRole::CharCounter, self.char_counter.as_str()),
            (ElementRole::Notifications, self.notifications.as_str()),
        ]
    }

    /// Fails on the first required role whose id the surface does not know.
    pub fn validate<S: ChatSurface + ?Sized>(&self, surface: &S) -> ClientResult<()> {
        for (role, id) in self.required() {
            ensure!(
                surface.has_element(id),
                MissingElementSnafu {
                    stage: "validate-bindings",
                    role,
                    id: id.to_string(),
                }
            );
        }

        if let Some(id) = self.export_button.as_deref()
            && !surface.has_element(id)
        {
            tracing::debug!(id, "export control not present, export stays reachable by call only");
        }

        Ok(())
    }
}

/// Rendering target driven by the client.
///
/// Implementations own presentation only; all conversation state stays in the
/// client.
pub trait ChatSurface {
    fn has_element(&self, id: &str) -> bool;

    fn append_message(&mut self, message: &RenderedMessage);

    /// Drops every rendered message after the first `keep`.
    fn retain_messages(&mut self, keep: usize);

    fn set_input_enabled(&mut self, enabled: bool);

    fn set_send_enabled(&mut self, enabled: bool);

    fn set_input_text(&mut self, text: &str);

    fn set_char_counter(&mut self, counter: CharCounter);

    fn set_typing_indicator(&mut self, visible: bool);

    fn apply_theme(&mut self, theme: ThemeMode);

    fn notify(&mut self, notification: &Notification);

    /// Blocking yes/no question; `false` declines.
    fn confirm(&mut self, title: &str, detail: &str) -> bool;
}
