use serde::{Deserialize, Serialize};

/// Protocol version (bumped when breaking changes are introduced)
pub const VERSION: u8 = 1;

/// Events sent by a browser over the chat socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    ChatMessage(ChatMessage),
    Typing(Typing),
    StopTyping,
}

/// Events pushed by the server over the chat socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    BotResponse(BotResponse),
    UserTyping(Typing),
    UserStopTyping,
    Error(ErrorNotice),
}

/// A line of user text. `user_id` keys the conversation when present,
/// otherwise the connection id does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<u8>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BotResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<u8>,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// RFC 3339
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Typing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorNotice {
    pub message: String,
}

impl ClientEvent {
    pub fn chat<S: Into<String>>(message: S, user_id: Option<String>) -> Self {
        ClientEvent::ChatMessage(ChatMessage {
            v: Some(VERSION),
            message: message.into(),
            user_id,
        })
    }
}

impl ServerEvent {
    pub fn bot_response<S: Into<String>>(
        message: S,
        data: Option<serde_json::Value>,
        quick_replies: Vec<String>,
        action: Option<String>,
        timestamp: String,
    ) -> Self {
        ServerEvent::BotResponse(BotResponse {
            v: Some(VERSION),
            message: message.into(),
            data,
            quick_replies,
            action,
            timestamp,
        })
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        ServerEvent::Error(ErrorNotice { message: message.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_chat_message_wire_shape() {
        let raw = r#"{"type":"chat_message","message":"hi","userId":"u1"}"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::ChatMessage(ChatMessage {
                v: None,
                message: "hi".into(),
                user_id: Some("u1".into()),
            })
        );
    }

    #[test]
    fn chat_helper_stamps_version() {
        let json = serde_json::to_value(ClientEvent::chat("book flight 1", None)).unwrap();
        assert_eq!(json["type"], "chat_message");
        assert_eq!(json["v"], VERSION);
        assert!(json.get("userId").is_none());
    }

    #[test]
    fn stop_typing_has_no_payload() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"stop_typing"}"#).unwrap();
        assert_eq!(event, ClientEvent::StopTyping);
    }

    #[test]
    fn bot_response_omits_empty_quick_replies() {
        let event = ServerEvent::bot_response("hello", None, vec![], None, "2026-01-01T00:00:00Z".into());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "bot_response");
        assert_eq!(json["message"], "hello");
        assert!(json.get("quickReplies").is_none());
        assert!(json["data"].is_null());
    }
}
