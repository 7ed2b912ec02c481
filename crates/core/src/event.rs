//! Inbound events delivered by the session transport.
//!
//! The transport hands over raw [`WireEvent`]s: a dotted event name plus
//! an uninterpreted JSON payload. [`ServerEvent::classify`] turns them
//! into the typed shapes the transcript reducer folds over, so no
//! string matching on names or payload fields leaks past this module.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Event name announcing a newly created conversation.
pub const CONVERSATION_CREATED: &str = "server.conversation.created";
/// Event name marking a fully assembled message.
pub const MESSAGE_COMPLETED: &str = "server.conversation.message.completed";

/// A raw event as delivered by the transport.
#[derive(Debug, Clone)]
pub struct WireEvent {
    pub name: String,
    pub payload: Value,
}

impl WireEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Role attached to a completed message.
///
/// Unrecognized roles keep their raw name so they can be rendered as a
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MessageKind {
    Answer,
    Question,
    Other(String),
}

impl From<String> for MessageKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "answer" => Self::Answer,
            "question" => Self::Question,
            _ => Self::Other(raw),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answer => f.write_str("answer"),
            Self::Question => f.write_str("question"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Content encoding of a completed message. Anything but `text` is
/// collapsed to [`ContentType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ContentType {
    Text,
    #[default]
    Other,
}

impl From<String> for ContentType {
    fn from(raw: String) -> Self {
        if raw == "text" { Self::Text } else { Self::Other }
    }
}

/// Payload of [`CONVERSATION_CREATED`].
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationCreated {
    #[serde(default)]
    pub prologue: String,
}

/// Payload of [`MESSAGE_COMPLETED`].
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCompleted {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub content: String,
}

/// A wire event classified into the shapes the reducer understands.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    ConversationCreated(ConversationCreated),
    MessageCompleted(MessageCompleted),
    /// Any event the transcript does not render.
    Other { name: String },
}

impl ServerEvent {
    /// Classifies a raw transport event.
    ///
    /// Recognized names whose payload fails to deserialize are demoted
    /// to [`ServerEvent::Other`]; a malformed frame must not tear down
    /// the event stream.
    pub fn classify(event: WireEvent) -> Self {
        let WireEvent { name, payload } = event;
        match name.as_str() {
            CONVERSATION_CREATED => match serde_json::from_value(payload) {
                Ok(data) => Self::ConversationCreated(data),
                Err(err) => {
                    debug!(%name, error = %err, "discarding undecodable payload");
                    Self::Other { name }
                }
            },
            MESSAGE_COMPLETED => match serde_json::from_value(payload) {
                Ok(data) => Self::MessageCompleted(data),
                Err(err) => {
                    debug!(%name, error = %err, "discarding undecodable payload");
                    Self::Other { name }
                }
            },
            _ => Self::Other { name },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_text_answer() {
        let event = WireEvent::new(
            MESSAGE_COMPLETED,
            json!({"type": "answer", "content_type": "text", "content": "Hello"}),
        );
        match ServerEvent::classify(event) {
            ServerEvent::MessageCompleted(msg) => {
                assert_eq!(msg.kind, MessageKind::Answer);
                assert_eq!(msg.content_type, ContentType::Text);
                assert_eq!(msg.content, "Hello");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn preserves_raw_kind_for_unknown_types() {
        let event = WireEvent::new(
            MESSAGE_COMPLETED,
            json!({"type": "function_call", "content_type": "text", "content": "x"}),
        );
        match ServerEvent::classify(event) {
            ServerEvent::MessageCompleted(msg) => {
                assert_eq!(msg.kind, MessageKind::Other("function_call".into()));
                assert_eq!(msg.kind.to_string(), "function_call");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn non_text_content_type_collapses_to_other() {
        let event = WireEvent::new(
            MESSAGE_COMPLETED,
            json!({"type": "question", "content_type": "audio", "content": "…"}),
        );
        match ServerEvent::classify(event) {
            ServerEvent::MessageCompleted(msg) => {
                assert_eq!(msg.kind, MessageKind::Question);
                assert_eq!(msg.content_type, ContentType::Other);
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn classifies_conversation_created() {
        let event = WireEvent::new(CONVERSATION_CREATED, json!({"prologue": "Hi!"}));
        match ServerEvent::classify(event) {
            ServerEvent::ConversationCreated(created) => assert_eq!(created.prologue, "Hi!"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn unknown_names_pass_through_untyped() {
        let event = WireEvent::new("server.audio.delta", json!({"data": "…"}));
        match ServerEvent::classify(event) {
            ServerEvent::Other { name } => assert_eq!(name, "server.audio.delta"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn malformed_completed_payload_is_demoted() {
        // `type` is mandatory for a completed message.
        let event = WireEvent::new(MESSAGE_COMPLETED, json!({"content": "Hello"}));
        assert!(matches!(
            ServerEvent::classify(event),
            ServerEvent::Other { .. }
        ));
    }
}
