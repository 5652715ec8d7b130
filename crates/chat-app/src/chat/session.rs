use std::sync::Arc;

use chatbot_storage::{KeyValueStore, SessionId, StorageKeys};
use snafu::ResultExt;

use crate::error::{ClientResult, StorageSnafu};
use crate::settings::ThemeMode;

/// Session id and theme flag kept in the local store.
#[derive(Clone)]
pub struct PersistedState {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl PersistedState {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    /// Stored session id, without generating one.
    ///
    /// An unparsable stored value reads as absent.
    pub fn peek_session_id(&self) -> ClientResult<Option<SessionId>> {
        let raw = self
            .store
            .get_item(&self.keys.session_id())
            .context(StorageSnafu {
                stage: "read-session-id",
            })?;

        Ok(raw.and_then(|raw| match SessionId::parse(&raw) {
            Ok(session_id) => Some(session_id),
            Err(error) => {
                tracing::warn!(raw = %raw, error = %error, "ignoring malformed stored session id");
                None
            }
        }))
    }

    /// Stored session id, generating and persisting a fresh one when absent.
    pub fn session_id(&self) -> ClientResult<SessionId> {
        if let Some(session_id) = self.peek_session_id()? {
            return Ok(session_id);
        }

        let session_id = SessionId::generate();
        self.store
            .set_item(&self.keys.session_id(), &session_id.to_string())
            .context(StorageSnafu {
                stage: "write-session-id",
            })?;
        tracing::debug!(session_id = %session_id, "generated session id");
        Ok(session_id)
    }

    pub fn discard_session_id(&self) -> ClientResult<()> {
        self.store
            .remove_item(&self.keys.session_id())
            .context(StorageSnafu {
                stage: "remove-session-id",
            })
    }

    pub fn theme(&self) -> ClientResult<ThemeMode> {
        let raw = self
            .store
            .get_item(&self.keys.theme())
            .context(StorageSnafu { stage: "read-theme" })?;
        Ok(raw.as_deref().map(ThemeMode::parse).unwrap_or_default())
    }

    pub fn save_theme(&self, theme: ThemeMode) -> ClientResult<()> {
        self.store
            .set_item(&self.keys.theme(), theme.name())
            .context(StorageSnafu {
                stage: "write-theme",
            })
    }
}

#[cfg(test)]
mod tests {
    use chatbot_storage::{DJANGO_KEY_PREFIX, MemoryStore};

    use super::*;

    fn state() -> (Arc<MemoryStore>, PersistedState) {
        let store = Arc::new(MemoryStore::new());
        let state = PersistedState::new(store.clone(), StorageKeys::new(DJANGO_KEY_PREFIX));
        (store, state)
    }

    #[test]
    fn session_id_is_stable_until_discarded() {
        let (store, state) = state();

        let first = state.session_id().unwrap();
        assert_eq!(state.session_id().unwrap(), first);
        assert_eq!(
            store.get_item("django-chat-session-id").unwrap(),
            Some(first.to_string())
        );

        state.discard_session_id().unwrap();
        assert_eq!(state.peek_session_id().unwrap(), None);
        assert_ne!(state.session_id().unwrap(), first);
    }

    #[test]
    fn malformed_session_id_is_replaced() {
        let (store, state) = state();
        store.set_item("django-chat-session-id", "garbage").unwrap();

        assert_eq!(state.peek_session_id().unwrap(), None);
        let fresh = state.session_id().unwrap();
        assert_eq!(
            store.get_item("django-chat-session-id").unwrap(),
            Some(fresh.to_string())
        );
    }

    #[test]
    fn theme_round_trips_through_store() {
        let (store, state) = state();
        assert_eq!(state.theme().unwrap(), ThemeMode::Light);

        state.save_theme(ThemeMode::Dark).unwrap();
        assert_eq!(
            store.get_item("django-chatbot-theme").unwrap().as_deref(),
            Some("dark")
        );
        assert_eq!(state.theme().unwrap(), ThemeMode::Dark);
    }
}
