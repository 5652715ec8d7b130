/// Input events a surface forwards to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SendClicked,
    /// Enter in the message box. Shift+Enter is left to the surface as a newline.
    EnterPressed {
        shift: bool,
    },
    InputChanged(String),
    ClearClicked,
    ExportClicked,
    ThemeToggled,
}

/// Client operation an event resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Send,
    UpdateInput(String),
    Clear,
    Export,
    ToggleTheme,
}

impl UiEvent {
    /// Maps the event onto a client operation; `None` means the event is ignored.
    pub fn into_action(self) -> Option<UiAction> {
        match self {
            Self::SendClicked | Self::EnterPressed { shift: false } => Some(UiAction::Send),
            Self::EnterPressed { shift: true } => None,
            Self::InputChanged(text) => Some(UiAction::UpdateInput(text)),
            Self::ClearClicked => Some(UiAction::Clear),
            Self::ExportClicked => Some(UiAction::Export),
            Self::ThemeToggled => Some(UiAction::ToggleTheme),
        }
    }
}
