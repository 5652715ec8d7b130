/// Key prefix used by the Django-facing widget.
pub const DJANGO_KEY_PREFIX: &str = "django-";

const THEME_KEY_SUFFIX: &str = "chatbot-theme";
const SESSION_ID_KEY_SUFFIX: &str = "chat-session-id";

/// Resolves the local-store keys for one widget profile.
///
/// The two backend flavors historically kept their values under different keys,
/// so both keys hang off a configurable prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn theme(&self) -> String {
        format!("{}{THEME_KEY_SUFFIX}", self.prefix)
    }

    pub fn session_id(&self) -> String {
        format!("{}{SESSION_ID_KEY_SUFFIX}", self.prefix)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_prefix() {
        let keys = StorageKeys::new(DJANGO_KEY_PREFIX);
        assert_eq!(keys.theme(), "django-chatbot-theme");
        assert_eq!(keys.session_id(), "django-chat-session-id");

        let plain = StorageKeys::default();
        assert_eq!(plain.theme(), "chatbot-theme");
        assert_eq!(plain.session_id(), "chat-session-id");
    }
}
