use std::collections::HashSet;
use std::io::{BufRead, Write};

use snafu::ResultExt;

use crate::chat::{
    CharCounter, ChatClient, ChatSurface, ElementBindings, Notification, RenderedMessage, Role,
    UiEvent,
};
use crate::error::{ClientError, ClientResult, ReadInputSnafu};
use crate::settings::ThemeMode;

const HELP: &str = "commands: /clear  /export  /theme  /quit";

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Clear,
    Export,
    Theme,
    Quit,
    Help,
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    match trimmed {
        "" => Command::Empty,
        "/clear" => Command::Clear,
        "/export" => Command::Export,
        "/theme" => Command::Theme,
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        _ => Command::Send(line.to_string()),
    }
}

/// Line-oriented surface: bubbles and notifications go to `writer`,
/// prompts and confirmations are read from `reader`.
pub struct TerminalSurface<R, W> {
    reader: R,
    writer: W,
    elements: HashSet<String>,
    typing: bool,
}

impl<R: BufRead, W: Write> TerminalSurface<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_elements(reader, writer, &ElementBindings::default())
    }

    /// Provides a stand-in for every control named in `bindings`.
    pub fn with_elements(reader: R, writer: W, bindings: &ElementBindings) -> Self {
        let mut elements: HashSet<String> = bindings
            .required()
            .iter()
            .map(|(_, id)| id.to_string())
            .collect();
        elements.extend(bindings.export_button.clone());

        Self {
            reader,
            writer,
            elements,
            typing: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Next input line without its terminator, `None` at end of input.
    pub fn read_line(&mut self) -> ClientResult<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context(ReadInputSnafu { stage: "read-line" })?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn emit(&mut self, line: &str) {
        if let Err(error) = writeln!(self.writer, "{line}").and_then(|()| self.writer.flush()) {
            tracing::warn!(error = %error, "failed to write to terminal");
        }
    }
}

impl<R: BufRead, W: Write> ChatSurface for TerminalSurface<R, W> {
    fn has_element(&self, id: &str) -> bool {
        self.elements.contains(id)
    }

    fn append_message(&mut self, message: &RenderedMessage) {
        let speaker = match (message.role, message.is_error) {
            (Role::User, _) => "you",
            (Role::Bot, false) => "bot",
            (Role::Bot, true) => "bot (error)",
        };
        self.emit(&format!(
            "[{}] {speaker}: {}",
            message.time_label, message.text
        ));
    }

    fn retain_messages(&mut self, keep: usize) {
        tracing::debug!(keep, "terminal transcript cannot be rewound");
    }

    fn set_input_enabled(&mut self, _enabled: bool) {}

    fn set_send_enabled(&mut self, _enabled: bool) {}

    fn set_input_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.emit(&format!("(message shortened to: {text})"));
        }
    }

    fn set_char_counter(&mut self, counter: CharCounter) {
        if counter.near_limit() {
            self.emit(&format!("({counter} characters)"));
        }
    }

    fn set_typing_indicator(&mut self, visible: bool) {
        if visible && !self.typing {
            self.emit("bot is typing...");
        }
        self.typing = visible;
    }

    fn apply_theme(&mut self, theme: ThemeMode) {
        tracing::debug!(theme = %theme, "terminal keeps its own colors");
    }

    fn notify(&mut self, notification: &Notification) {
        self.emit(&format!(
            "* {}: {}",
            notification.kind.name(),
            notification.message
        ));
    }

    fn confirm(&mut self, title: &str, detail: &str) -> bool {
        self.emit(&format!("{title}\n{detail} [y/N]"));
        match self.read_line() {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read confirmation");
                false
            }
        }
    }
}

/// Reads commands until `/quit` or end of input.
pub async fn run<R: BufRead, W: Write>(
    client: &mut ChatClient<TerminalSurface<R, W>>,
) -> ClientResult<()> {
    client.start().await?;
    client.surface_mut().emit(HELP);

    while let Some(line) = client.surface_mut().read_line()? {
        let events = match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => {
                client.surface_mut().emit(HELP);
                continue;
            }
            Command::Send(text) => vec![UiEvent::InputChanged(text), UiEvent::SendClicked],
            Command::Clear => vec![UiEvent::ClearClicked],
            Command::Export => vec![UiEvent::ExportClicked],
            Command::Theme => vec![UiEvent::ThemeToggled],
        };

        for event in events {
            match client.handle_event(event).await {
                Ok(_) => {}
                Err(error @ ClientError::ReadInput { .. }) => return Err(error),
                Err(error) => {
                    tracing::warn!(error = %error, "command failed");
                    if !error.is_reported() {
                        client
                            .surface_mut()
                            .notify(&Notification::error(format!("Unexpected error: {error}")));
                    }
                }
            }
        }
    }

    tracing::info!(turns = client.history().len(), "leaving chat");
    Ok(())
}
