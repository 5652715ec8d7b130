use std::path::PathBuf;
use std::sync::Arc;

use chatbot_backend::{BackendError, ChatBackend, ChatRequest, HistoryEntry};
use chatbot_storage::KeyValueStore;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use snafu::ResultExt;

use crate::chat::events::{UiAction, UiEvent};
use crate::chat::markup::MarkupPolicy;
use crate::chat::message::{ConversationTurn, Notification, RenderedMessage, Role};
use crate::chat::message_input::MessageInput;
use crate::chat::session::PersistedState;
use crate::chat::surface::ChatSurface;
use crate::error::{BackendSnafu, ClientError, ClientResult, UserCancelledSnafu};
use crate::export::HistoryExport;
use crate::settings::{ClientSettings, ThemeMode};

const SEND_FAILED_REPLY: &str = "Sorry, something went wrong. Please try again.";
const SEND_FAILED_NOTICE: &str = "Failed to send message";
const CLEAR_CONFIRM_TITLE: &str = "Are you sure you want to clear the conversation?";
const CLEAR_CONFIRM_DETAIL: &str = "This action cannot be undone.";
const CLEAR_DONE_NOTICE: &str = "Conversation cleared!";
const CLEAR_FAILED_NOTICE: &str = "Failed to clear conversation.";
const EXPORT_EMPTY_NOTICE: &str = "No conversation to export.";
const EXPORT_DONE_NOTICE: &str = "History exported!";
const EXPORT_FAILED_NOTICE: &str = "Failed to export history.";

/// Result of one send attempt.
#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing to send.
    Skipped,
    Replied(ConversationTurn),
    Failed(BackendError),
}

/// What a dispatched [`UiEvent`] ended up doing.
#[derive(Debug)]
pub enum EventOutcome {
    Ignored,
    Sent(SendOutcome),
    InputUpdated,
    Cleared,
    Exported(Option<PathBuf>),
    ThemeChanged(ThemeMode),
}

/// Conversation controller bound to one rendering surface.
///
/// Owns the visible message list and the client-side history; the backend and
/// the local store are shared handles.
pub struct ChatClient<S: ChatSurface> {
    backend: Arc<dyn ChatBackend>,
    state: PersistedState,
    surface: S,
    markup: MarkupPolicy,
    welcome_message: String,
    platform: &'static str,
    key_prefix: String,
    export_dir: PathBuf,
    input: MessageInput,
    theme: ThemeMode,
    visible: Vec<RenderedMessage>,
    history: Vec<ConversationTurn>,
    started: bool,
}

impl<S: ChatSurface> ChatClient<S> {
    pub fn new(
        settings: &ClientSettings,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn KeyValueStore>,
        surface: S,
    ) -> ClientResult<Self> {
        settings.bindings.validate(&surface)?;

        Ok(Self {
            state: PersistedState::new(store, settings.storage_keys()),
            markup: settings.markup_policy(),
            welcome_message: settings.welcome_message.clone(),
            platform: backend.flavor().platform_name(),
            key_prefix: settings.key_prefix().to_string(),
            export_dir: settings.export_dir.clone(),
            input: MessageInput::new(settings.max_message_chars),
            theme: ThemeMode::default(),
            visible: Vec::new(),
            history: Vec::new(),
            started: false,
            backend,
            surface,
        })
    }

    /// Applies the stored theme, shows the welcome bubble and replays server history.
    ///
    /// Runs once; later calls are no-ops.
    pub async fn start(&mut self) -> ClientResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        self.theme = self.state.theme()?;
        self.surface.apply_theme(self.theme);

        let welcome = self.render_message(&self.welcome_message, Role::Bot, false);
        self.push_bubble(RenderedMessage {
            animate: false,
            ..welcome
        });
        self.refresh_input();

        if self.backend.capabilities().history {
            self.load_history().await;
        }

        tracing::info!(
            flavor = %self.backend.flavor(),
            theme = %self.theme,
            replayed = self.history.len(),
            "chat client started"
        );
        Ok(())
    }

    async fn load_history(&mut self) {
        let session_id = match self.state.peek_session_id() {
            Ok(session_id) => session_id,
            Err(error) => {
                tracing::debug!(error = %error, "no session id available for history");
                None
            }
        };

        let entries = match self.backend.load_history(session_id).await {
            Ok(entries) => entries,
            Err(error) => {
                tracing::debug!(error = %error, "no history loaded");
                return;
            }
        };

        for entry in entries {
            let user = self.render_message(&entry.user_message, Role::User, false);
            self.push_bubble(RenderedMessage {
                animate: false,
                ..user
            });
            let bot = self.render_message(&entry.bot_response, Role::Bot, false);
            self.push_bubble(RenderedMessage {
                animate: false,
                ..bot
            });
            self.history.push(turn_from_history(entry));
        }
    }

    pub fn render_message(&self, text: &str, role: Role, is_error: bool) -> RenderedMessage {
        RenderedMessage {
            role,
            html: self.markup.render(text),
            text: text.to_string(),
            is_error,
            time_label: Local::now().format("%H:%M").to_string(),
            animate: true,
        }
    }

    /// Sends the current input text.
    ///
    /// Failures never escalate: they end as an error bubble plus a notification.
    pub async fn send_message(&mut self) -> SendOutcome {
        let Some(message) = self.input.submission() else {
            return SendOutcome::Skipped;
        };

        self.set_input_enabled(false);
        let user = self.render_message(&message, Role::User, false);
        self.push_bubble(user);
        self.input.clear();
        self.surface.set_input_text("");
        self.surface.set_char_counter(self.input.counter());
        self.set_typing(true);

        let mut request = ChatRequest::new(message.clone());
        if self.backend.capabilities().session_ids {
            match self.state.session_id() {
                Ok(session_id) => request = request.with_session_id(session_id),
                Err(error) => {
                    tracing::warn!(error = %error, "sending without session id");
                }
            }
        }

        let outcome = match self.backend.send_message(request).await {
            Ok(reply) => {
                self.set_typing(false);
                let bot = self.render_message(&reply.response, Role::Bot, false);
                self.push_bubble(bot);

                let turn = ConversationTurn::new(message, reply.response, Utc::now());
                self.history.push(turn.clone());
                tracing::debug!(turns = self.history.len(), "reply received");
                SendOutcome::Replied(turn)
            }
            Err(error) => {
                self.set_typing(false);
                let bubble = self.render_message(SEND_FAILED_REPLY, Role::Bot, true);
                self.push_bubble(bubble);
                self.notify(Notification::error(SEND_FAILED_NOTICE));
                tracing::error!(error = %error, status = ?error.status(), "failed to send message");
                SendOutcome::Failed(error)
            }
        };

        self.set_input_enabled(true);
        outcome
    }

    /// Clears the conversation after confirmation.
    ///
    /// Client state changes only once the backend confirmed the clear.
    pub async fn clear_conversation(&mut self) -> ClientResult<()> {
        if !self
            .surface
            .confirm(CLEAR_CONFIRM_TITLE, CLEAR_CONFIRM_DETAIL)
        {
            return UserCancelledSnafu {
                stage: "confirm-clear",
                operation: "clear conversation",
            }
            .fail();
        }

        let session_id = if self.backend.capabilities().session_ids {
            self.state.peek_session_id().unwrap_or_else(|error| {
                tracing::warn!(error = %error, "clearing without session id");
                None
            })
        } else {
            None
        };

        if let Err(error) = self.backend.clear_session(session_id).await {
            self.notify(Notification::error(CLEAR_FAILED_NOTICE));
            tracing::error!(error = %error, "failed to clear conversation");
            return Err(error).context(BackendSnafu {
                stage: "clear-session",
            });
        }

        let keep = self.visible.len().min(1);
        self.visible.truncate(keep);
        self.surface.retain_messages(keep);
        self.history.clear();
        if let Err(error) = self.state.discard_session_id() {
            tracing::warn!(error = %error, "failed to discard stored session id");
        }
        self.notify(Notification::success(CLEAR_DONE_NOTICE));
        tracing::info!("conversation cleared");
        Ok(())
    }

    /// Writes the client-side history as a JSON file.
    ///
    /// Returns `None` when there is nothing to export.
    pub fn export_history(&mut self) -> ClientResult<Option<PathBuf>> {
        if self.history.is_empty() {
            self.notify(Notification::warning(EXPORT_EMPTY_NOTICE));
            return Ok(None);
        }

        let result = self.write_export();
        match &result {
            Ok(_) => self.notify(Notification::success(EXPORT_DONE_NOTICE)),
            Err(error) => {
                self.notify(Notification::error(EXPORT_FAILED_NOTICE));
                tracing::error!(error = %error, "failed to export history");
            }
        }
        result.map(Some)
    }

    fn write_export(&self) -> ClientResult<PathBuf> {
        let session_id = if self.backend.capabilities().session_ids {
            self.state
                .session_id()
                .inspect_err(|error| {
                    tracing::warn!(error = %error, "exporting without session id");
                })
                .ok()
        } else {
            None
        };
        let export = HistoryExport::new(
            self.platform,
            Utc::now(),
            session_id,
            self.history.clone(),
        );
        export.write_to_dir(&self.export_dir, &self.key_prefix)
    }

    pub fn toggle_theme(&mut self) -> ClientResult<ThemeMode> {
        self.theme = self.theme.toggled();
        self.surface.apply_theme(self.theme);
        self.state.save_theme(self.theme)?;

        let label = if self.theme.is_dark() { "Dark" } else { "Light" };
        self.notify(Notification::info(format!("{label} theme enabled!")));
        Ok(self.theme)
    }

    pub fn update_input(&mut self, text: &str) {
        self.input.set_text(text);
        if self.input.text() != text {
            self.surface.set_input_text(self.input.text());
        }
        self.refresh_input();
    }

    pub async fn handle_event(&mut self, event: UiEvent) -> ClientResult<EventOutcome> {
        let Some(action) = event.into_action() else {
            return Ok(EventOutcome::Ignored);
        };

        match action {
            UiAction::Send => Ok(EventOutcome::Sent(self.send_message().await)),
            UiAction::UpdateInput(text) => {
                self.update_input(&text);
                Ok(EventOutcome::InputUpdated)
            }
            UiAction::Clear => match self.clear_conversation().await {
                Ok(()) => Ok(EventOutcome::Cleared),
                Err(ClientError::UserCancelled { .. }) => Ok(EventOutcome::Ignored),
                Err(error) => Err(error),
            },
            UiAction::Export => self.export_history().map(EventOutcome::Exported),
            UiAction::ToggleTheme => self.toggle_theme().map(EventOutcome::ThemeChanged),
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn visible_messages(&self) -> &[RenderedMessage] {
        &self.visible
    }

    pub fn input(&self) -> &MessageInput {
        &self.input
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn push_bubble(&mut self, message: RenderedMessage) {
        self.surface.append_message(&message);
        self.visible.push(message);
    }

    fn notify(&mut self, notification: Notification) {
        self.surface.notify(&notification);
    }

    fn set_typing(&mut self, typing: bool) {
        self.surface.set_typing_indicator(typing);
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input.set_enabled(enabled);
        self.surface.set_input_enabled(enabled);
        self.surface.set_send_enabled(enabled && self.input.can_send());
    }

    fn refresh_input(&mut self) {
        self.surface.set_char_counter(self.input.counter());
        self.surface.set_send_enabled(self.input.can_send());
    }
}

fn turn_from_history(entry: HistoryEntry) -> ConversationTurn {
    let timestamp = entry
        .timestamp
        .as_deref()
        .and_then(parse_server_timestamp)
        .unwrap_or_else(Utc::now);
    ConversationTurn::new(entry.user_message, entry.bot_response, timestamp)
}

/// Accepts RFC 3339 and offset-less ISO timestamps, the latter read as UTC.
fn parse_server_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
