/// Conversation controller driving a [`ChatSurface`].
pub mod client;
/// Input events and the operations they map to.
pub mod events;
/// Escape, allow-list and linkify pipeline for message text.
pub mod markup;
/// Conversation records, rendered bubbles and notifications.
pub mod message;
pub mod message_input;
pub mod session;
pub mod surface;

pub use client::{ChatClient, EventOutcome, SendOutcome};
pub use events::{UiAction, UiEvent};
pub use markup::MarkupPolicy;
pub use message::{
    ConversationTurn, NOTIFICATION_DURATION, Notification, NotificationKind, RenderedMessage,
    Role,
};
pub use message_input::{CharCounter, MessageInput};
pub use session::PersistedState;
pub use surface::{ChatSurface, ElementBindings, ElementRole};
