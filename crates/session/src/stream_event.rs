//! The wire shape of one client-facing stream event.

use serde::{Deserialize, Serialize};

/// One event on the client stream: a text fragment, or the terminal marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub message: String,
    pub done: bool,
}

impl SessionEvent {
    pub fn fragment(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            done: false,
        }
    }

    /// The terminal event: empty message, `done: true`.
    pub fn done() -> Self {
        Self {
            message: String::new(),
            done: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_serializes_with_done_false() {
        let json = serde_json::to_string(&SessionEvent::fragment("안녕")).unwrap();
        assert_eq!(json, r#"{"message":"안녕","done":false}"#);
    }

    #[test]
    fn terminal_event_is_empty_and_done() {
        let json = serde_json::to_string(&SessionEvent::done()).unwrap();
        assert_eq!(json, r#"{"message":"","done":true}"#);
    }
}
