//! Messaging domain models.
//!
//! Conversation list entries (the inbox) and the messages of a single
//! patient/doctor thread.

use crate::reconcile::TrackedSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a message in a thread.
///
/// Optimistic messages carry a client-generated id until the server copy
/// is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageId {
    Local(Uuid),
    Server(String),
}

impl MessageId {
    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

/// Delivery state of a message as seen by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Delivery {
    /// Rendered optimistically; not yet acknowledged.
    Sending,
    /// Known to the server.
    Delivered,
    /// The send was rejected; the message stays visible with this reason.
    Failed(String),
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_is_self: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub delivery: Delivery,
}

impl ChatMessage {
    /// A message as returned by the server.
    pub fn from_server(
        id: impl Into<String>,
        sender_is_self: bool,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Server(id.into()),
            sender_is_self,
            content: content.into(),
            timestamp,
            delivery: Delivery::Delivered,
        }
    }

    /// A locally composed message awaiting the server.
    pub fn optimistic(
        local_id: Uuid,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Local(local_id),
            sender_is_self: true,
            content: content.into(),
            timestamp,
            delivery: Delivery::Sending,
        }
    }
}

/// An outgoing message recorded against a conversation preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// One row of the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub partner_id: String,
    pub partner_name: String,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread: u32,
}

impl TrackedSnapshot for ConversationSummary {
    type Version = Option<DateTime<Utc>>;
    type Mutation = OutgoingMessage;

    fn id(&self) -> &str {
        &self.partner_id
    }

    fn version(&self) -> Self::Version {
        self.last_message_at
    }

    fn reflects(&self, mutation: &OutgoingMessage) -> bool {
        self.last_message.trim() == mutation.content.trim()
    }

    fn apply(&self, mutation: &OutgoingMessage) -> Self {
        Self {
            last_message: mutation.content.clone(),
            last_message_at: self.last_message_at.max(Some(mutation.sent_at)),
            ..self.clone()
        }
    }

    fn mutation_version(mutation: &OutgoingMessage) -> Option<Self::Version> {
        Some(Some(mutation.sent_at))
    }
}

/// Body of `POST /chat/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub content: String,
}

/// Acknowledgement of a send; the server id is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
