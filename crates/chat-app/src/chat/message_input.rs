use std::fmt;

/// Counter shown next to the message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCounter {
    pub current: usize,
    pub max: usize,
}

impl CharCounter {
    pub fn new(current: usize, max: usize) -> Self {
        Self { current, max }
    }

    /// True once more than 90% of the budget is used.
    pub fn near_limit(&self) -> bool {
        self.current * 10 > self.max * 9
    }
}

impl fmt::Display for CharCounter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.current, self.max)
    }
}

/// Ephemeral state of the message box and its controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInput {
    text: String,
    max_chars: usize,
    enabled: bool,
}

impl MessageInput {
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars: max_chars.max(1),
            enabled: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text, cutting it at `max_chars` characters.
    pub fn set_text(&mut self, text: &str) {
        self.text = match text.char_indices().nth(self.max_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.to_string(),
        };
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Submitted message, `None` when only whitespace was typed.
    pub fn submission(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn can_send(&self) -> bool {
        self.enabled && self.submission().is_some()
    }

    pub fn counter(&self) -> CharCounter {
        CharCounter::new(self.text.chars().count(), self.max_chars)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
