//! Chat payloads delivered through `chatwoot:on-message`.
//!
//! These mirror the JSON the widget emits; the bridge itself never inspects
//! them and forwards the raw document. Hosts that want typed access decode
//! with [`ChatwootMessage::from_value`].
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

pub type AttributeMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatwootMessage {
    pub id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub account_id: i64,
    #[serde(default)]
    pub inbox_id: i64,
    #[serde(default)]
    pub conversation_id: i64,
    /// 0 = incoming, 1 = outgoing.
    #[serde(default)]
    pub message_type: i32,
    #[serde(default, rename = "created_at")]
    pub created_at_unix: i64,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_attributes: AttributeMap,
    #[serde(default)]
    pub sender_type: String,
    #[serde(default)]
    pub sender_id: i64,
    #[serde(default)]
    pub external_source_ids: AttributeMap,
    #[serde(default)]
    pub additional_attributes: AttributeMap,
    #[serde(default)]
    pub processed_message_content: String,
    #[serde(default)]
    pub sentiment: AttributeMap,
    #[serde(default)]
    pub conversation: ChatwootConversation,
    #[serde(default)]
    pub sender: ChatwootSender,
}

impl ChatwootMessage {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn created_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.created_at_unix).ok()
    }

    pub fn is_incoming(&self) -> bool {
        self.message_type == 0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatwootSender {
    #[serde(default)]
    pub additional_attributes: AttributeMap,
    #[serde(default)]
    pub custom_attributes: AttributeMap,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default, rename = "type")]
    pub sender_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatwootConversation {
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub unread_count: i64,
    #[serde(default, rename = "last_activity_at")]
    pub last_activity_at_unix: i64,
    #[serde(default)]
    pub contact_inbox: ChatwootContactInbox,
}

impl ChatwootConversation {
    pub fn last_activity_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.last_activity_at_unix).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatwootContactInbox {
    #[serde(default)]
    pub source_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_widget_message_event() {
        let message = ChatwootMessage::from_value(json!({
            "id": 42,
            "content": "hello there",
            "account_id": 1,
            "inbox_id": 3,
            "conversation_id": 7,
            "message_type": 1,
            "created_at": 1_700_000_000,
            "updated_at": "2023-11-14T22:13:20Z",
            "private": false,
            "status": "sent",
            "content_type": "text",
            "content_attributes": {},
            "sender_type": "User",
            "sender_id": 9,
            "conversation": {
                "assignee_id": null,
                "unread_count": 2,
                "last_activity_at": 1_700_000_060,
                "contact_inbox": {"source_id": "src-1"}
            },
            "sender": {
                "id": 9,
                "name": "Agent Smith",
                "thumbnail": "",
                "type": "user",
                "custom_attributes": {"tier": "gold"}
            }
        }))
        .unwrap();

        assert_eq!(message.id, 42);
        assert!(!message.is_incoming());
        assert_eq!(
            message.created_at().map(|t| t.unix_timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(message.updated_at.map(|t| t.year()), Some(2023));
        assert_eq!(message.conversation.contact_inbox.source_id, "src-1");
        assert_eq!(message.conversation.assignee_id, None);
        assert_eq!(message.sender.sender_type, "user");
        assert_eq!(message.sender.custom_attributes["tier"], json!("gold"));
    }

    #[test]
    fn minimal_payload_fills_defaults() {
        let message = ChatwootMessage::from_value(json!({"id": 1, "content": "hi"})).unwrap();
        assert_eq!(message.content, "hi");
        assert!(message.is_incoming());
        assert!(message.updated_at.is_none());
        assert_eq!(message.sender, ChatwootSender::default());
    }

    #[test]
    fn rejects_payload_without_id() {
        assert!(ChatwootMessage::from_value(json!({"content": "hi"})).is_err());
    }
}
