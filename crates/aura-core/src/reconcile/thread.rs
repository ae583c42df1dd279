//! Append-only merge of conversation threads.
//!
//! From the client's point of view a thread only grows. Server snapshots are
//! unioned into it by message id; an optimistic message stays in place until
//! its server copy shows up, and is then replaced rather than duplicated.

use crate::chat::{ChatMessage, Delivery, MessageId};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// How far apart an optimistic message and its server copy may be stamped
/// and still be considered the same message.
pub const MATCH_WINDOW_SECS: i64 = 300;

/// A reconciled message thread with one partner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationThread {
    partner_id: String,
    messages: Vec<ChatMessage>,
}

impl ConversationThread {
    pub fn new(partner_id: impl Into<String>) -> Self {
        Self {
            partner_id: partner_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    /// Messages ordered by timestamp.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Latest message, if any.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Appends an optimistic outgoing message and returns its local id.
    pub fn push_optimistic(&mut self, content: impl Into<String>, now: DateTime<Utc>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.messages.push(ChatMessage::optimistic(local_id, content, now));
        self.sort();
        local_id
    }

    /// Marks an optimistic message acknowledged, adopting the server id when known.
    ///
    /// If a snapshot already delivered that server id, the optimistic copy is
    /// folded into it instead of keeping two entries.
    pub fn acknowledge(&mut self, local_id: Uuid, server_id: Option<String>) {
        let Some(pos) = self.position(&MessageId::Local(local_id)) else {
            return;
        };
        match server_id {
            Some(server_id) => {
                let server_id = MessageId::Server(server_id);
                if self.position(&server_id).is_some() {
                    self.messages.remove(pos);
                } else {
                    let message = &mut self.messages[pos];
                    message.id = server_id;
                    message.delivery = Delivery::Delivered;
                }
            }
            None => self.messages[pos].delivery = Delivery::Delivered,
        }
    }

    /// Flags an optimistic message as failed. It stays in the thread.
    pub fn mark_failed(&mut self, local_id: Uuid, reason: impl Into<String>) {
        if let Some(pos) = self.position(&MessageId::Local(local_id)) {
            self.messages[pos].delivery = Delivery::Failed(reason.into());
        }
    }

    /// Merges a server snapshot of the thread.
    ///
    /// Returns the number of messages that were new to this client.
    pub fn merge(&mut self, snapshot: Vec<ChatMessage>) -> usize {
        let mut incoming = snapshot;
        incoming.sort_by_key(|m| m.timestamp);

        let mut added = 0;
        for message in incoming {
            if let Some(pos) = self.position(&message.id) {
                self.messages[pos] = message;
                continue;
            }
            if message.sender_is_self
                && let Some(pos) = self.matching_optimistic(&message)
            {
                tracing::debug!(
                    "[ConversationThread] {} optimistic message matched server copy {:?}",
                    self.partner_id,
                    message.id
                );
                self.messages[pos] = message;
                continue;
            }
            self.messages.push(message);
            added += 1;
        }
        self.sort();
        added
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    /// Oldest local message with the same content within the match window.
    fn matching_optimistic(&self, server: &ChatMessage) -> Option<usize> {
        let window = Duration::seconds(MATCH_WINDOW_SECS);
        self.messages.iter().position(|local| {
            let skew = local.timestamp.signed_duration_since(server.timestamp);
            local.id.is_local()
                && local.sender_is_self
                && local.content.trim() == server.content.trim()
                && skew <= window
                && skew >= -window
        })
    }

    fn sort(&mut self) {
        // Stable: equal timestamps keep insertion order.
        self.messages.sort_by_key(|m| m.timestamp);
    }
}
