//! Defines the WebSocket message protocol between the voice-agent provider and the bridge.
//!
//! The provider pushes a [`TranscriptEvent`] every time the conversation
//! changes; the bridge answers with a series of [`ResponseFragment`]s that
//! echo the event's `response_id`.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};

/// Who spoke a turn. Anything the provider does not label `agent` is the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Agent,
    User,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == "agent" {
            Role::Agent
        } else {
            Role::User
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Agent => "agent".to_string(),
            Role::User => "user".to_string(),
        }
    }
}

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Whether the provider expects the bridge to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// The caller is still talking; update the transcript only.
    UpdateOnly,
    ResponseRequired,
    /// The caller went quiet and the agent should nudge them.
    ReminderRequired,
}

impl InteractionType {
    pub fn requires_response(self) -> bool {
        !matches!(self, InteractionType::UpdateOnly)
    }
}

/// Messages sent from the provider to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub response_id: i64,
    #[serde(default)]
    pub transcript: Vec<Turn>,
    pub interaction_type: InteractionType,
}

/// Messages sent from the bridge to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFragment {
    pub response_id: i64,
    pub content: String,
    pub content_complete: bool,
    pub end_call: bool,
}

impl ResponseFragment {
    /// A piece of generated speech. Generated content never claims to be complete.
    pub fn partial(response_id: i64, content: impl Into<String>) -> Self {
        Self {
            response_id,
            content: content.into(),
            content_complete: false,
            end_call: false,
        }
    }
}

/// Parses an inbound text frame.
pub fn decode_event(text: &str) -> Result<TranscriptEvent, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Serializes an outbound fragment for a text frame.
pub fn encode_fragment(fragment: &ResponseFragment) -> Result<String, serde_json::Error> {
    serde_json::to_string(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_response_required_event() {
        let json = r#"{
            "response_id": 7,
            "transcript": [
                {"role": "agent", "content": "Hello there"},
                {"role": "user", "content": "hi"}
            ],
            "interaction_type": "response_required"
        }"#;
        let event = decode_event(json).unwrap();

        assert_eq!(event.response_id, 7);
        assert_eq!(event.interaction_type, InteractionType::ResponseRequired);
        assert_eq!(
            event.transcript,
            vec![Turn::new(Role::Agent, "Hello there"), Turn::new(Role::User, "hi")]
        );
    }

    #[test]
    fn test_unknown_role_is_user() {
        let json = r#"{"response_id":1,"transcript":[{"role":"caller","content":"x"}],"interaction_type":"update_only"}"#;
        let event = decode_event(json).unwrap();
        assert_eq!(event.transcript[0].role, Role::User);
    }

    #[test]
    fn test_missing_transcript_defaults_to_empty() {
        let event =
            decode_event(r#"{"response_id":3,"interaction_type":"reminder_required"}"#).unwrap();
        assert!(event.transcript.is_empty());
        assert_eq!(event.interaction_type, InteractionType::ReminderRequired);
    }

    #[test]
    fn test_unknown_interaction_type_is_rejected() {
        let result =
            decode_event(r#"{"response_id":3,"transcript":[],"interaction_type":"ping_pong"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_frame_is_rejected() {
        assert!(decode_event("not json").is_err());
        assert!(decode_event(r#"{"transcript":[]}"#).is_err());
    }

    #[test]
    fn test_requires_response() {
        assert!(!InteractionType::UpdateOnly.requires_response());
        assert!(InteractionType::ResponseRequired.requires_response());
        assert!(InteractionType::ReminderRequired.requires_response());
    }

    #[test]
    fn test_encode_fragment_wire_shape() {
        let json = encode_fragment(&ResponseFragment::partial(4, "Hel")).unwrap();
        assert_eq!(
            json,
            r#"{"response_id":4,"content":"Hel","content_complete":false,"end_call":false}"#
        );
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::new(Role::Agent, "a")).unwrap();
        assert_eq!(json, r#"{"role":"agent","content":"a"}"#);
    }
}
