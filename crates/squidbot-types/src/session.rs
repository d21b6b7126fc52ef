use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a conversation: a channel plus a sender within that channel.
///
/// `(channel, sender_id)` is the natural key used throughout the memory
/// store and agent loop; `id()` renders it to the single string used as a
/// filesystem-safe directory/file component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    pub channel: String,
    pub sender_id: String,
}

impl Session {
    pub fn new(channel: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}:{}", self.channel, self.sender_id)
    }

    /// A filesystem-safe rendering of `id()`: anything other than
    /// alphanumerics, `-`, and `_` is replaced with `_`.
    pub fn safe_id(&self) -> String {
        self.id()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_combines_channel_and_sender() {
        let s = Session::new("telegram", "12345");
        assert_eq!(s.id(), "telegram:12345");
    }

    #[test]
    fn safe_id_replaces_non_alphanumeric_characters() {
        let s = Session::new("terminal", "user@host");
        assert_eq!(s.safe_id(), "terminal_user_host");
    }
}
