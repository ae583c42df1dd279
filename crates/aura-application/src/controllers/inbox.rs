//! Inbox: conversation list plus the open thread.
//!
//! Sending is optimistic. The message is appended to the thread and written
//! over the conversation preview at once; the request runs in the background
//! and its outcome comes back through [`InboxController::process_next`]
//! like any poll event.

use super::{ViewUpdate, next_event, note_poll_failure};
use crate::context::AppContext;
use crate::poller::{PollEvent, PollHandle, start_polling};
use aura_core::access::ViewId;
use aura_core::chat::{
    ChatMessage, ConversationSummary, OutgoingMessage, SendMessageRequest, SendReceipt,
};
use aura_core::error::{AuraError, Result};
use aura_core::reconcile::{ConversationThread, MalformedStreak, Observation, ReconcilerMap};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxView {
    pub conversations: Vec<ConversationSummary>,
    pub active_partner: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub error: Option<String>,
}

/// Outcome of a background send.
#[derive(Debug)]
struct SendOutcome {
    partner_id: String,
    local_id: Uuid,
    result: Result<SendReceipt>,
}

struct ActiveThread {
    thread: ConversationThread,
    malformed: MalformedStreak,
    _poll: PollHandle,
    events: Option<UnboundedReceiver<PollEvent<Vec<ChatMessage>>>>,
}

enum InboxEvent {
    Conversations(PollEvent<Vec<ConversationSummary>>),
    Thread(PollEvent<Vec<ChatMessage>>),
    Sent(SendOutcome),
}

pub struct InboxController {
    ctx: Arc<AppContext>,
    conversations: ReconcilerMap<ConversationSummary>,
    notice: Option<String>,
    /// Last failed send; outlives later polls until the next send.
    send_error: Option<String>,
    poll: PollHandle,
    events: Option<UnboundedReceiver<PollEvent<Vec<ConversationSummary>>>>,
    active: Option<ActiveThread>,
    sent_tx: UnboundedSender<SendOutcome>,
    sent_rx: UnboundedReceiver<SendOutcome>,
    in_flight: usize,
}

impl InboxController {
    pub fn mount(ctx: Arc<AppContext>) -> std::result::Result<Self, ViewId> {
        ctx.enter(ViewId::Inbox)?;

        let fetch_ctx = ctx.clone();
        let (handle, events) = start_polling(
            ctx.scope(),
            "inbox",
            ctx.config().inbox_poll_interval(),
            move || {
                let ctx = fetch_ctx.clone();
                async move {
                    let token = ctx.token()?;
                    ctx.api().list_chats(&token).await
                }
            },
            |_| false,
        );
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();

        Ok(Self {
            conversations: ReconcilerMap::with_threshold(ctx.config().malformed_threshold),
            ctx,
            notice: None,
            send_error: None,
            poll: handle,
            events: Some(events),
            active: None,
            sent_tx,
            sent_rx,
            in_flight: 0,
        })
    }

    /// Opens the thread with `partner_id`, replacing any open one.
    pub fn open_thread(&mut self, partner_id: &str) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.thread.partner_id() == partner_id)
        {
            return;
        }

        let fetch_ctx = self.ctx.clone();
        let partner = partner_id.to_string();
        let (handle, events) = start_polling(
            self.ctx.scope(),
            format!("thread {}", partner_id),
            self.ctx.config().thread_poll_interval(),
            move || {
                let ctx = fetch_ctx.clone();
                let partner = partner.clone();
                async move {
                    let token = ctx.token()?;
                    ctx.api().chat_history(&token, &partner).await
                }
            },
            |_| false,
        );

        // Dropping the previous thread stops its poller.
        self.active = Some(ActiveThread {
            thread: ConversationThread::new(partner_id),
            malformed: MalformedStreak::new(
                format!("thread {}", partner_id),
                self.ctx.config().malformed_threshold,
            ),
            _poll: handle,
            events: Some(events),
        });
        tracing::debug!("[Inbox] Opened thread with {}", partner_id);
    }

    pub fn close_thread(&mut self) {
        self.active = None;
    }

    pub fn active_partner(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.thread.partner_id())
    }

    /// Sends `content` to the open thread's partner.
    ///
    /// Returns the local id of the optimistic message. The request itself is
    /// not awaited.
    pub fn send_message(&mut self, content: &str) -> Result<Uuid> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AuraError::validation("Message is empty"));
        }
        let Some(active) = self.active.as_mut() else {
            return Err(AuraError::validation("No conversation is open"));
        };
        let token = self.ctx.token()?;
        let partner_id = active.thread.partner_id().to_string();
        self.send_error = None;

        let now = Utc::now();
        let local_id = active.thread.push_optimistic(content, now);
        self.conversations.mutate(
            &partner_id,
            OutgoingMessage {
                content: content.to_string(),
                sent_at: now,
            },
        );

        let api = self.ctx.api().clone();
        let tx = self.sent_tx.clone();
        let request = SendMessageRequest {
            receiver_id: partner_id.clone(),
            content: content.to_string(),
        };
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = api.send_message(&token, &request).await;
            let _ = tx.send(SendOutcome {
                partner_id,
                local_id,
                result,
            });
        });
        Ok(local_id)
    }

    /// Waits for the next poll event or send outcome and applies it.
    ///
    /// Returns `None` once every poller has ended and no send is in flight,
    /// or a redirect to login if they ended because the session expired.
    pub async fn process_next(&mut self) -> Option<ViewUpdate> {
        loop {
            let inbox_live = self.events.is_some();
            let thread_live = self.active.as_ref().is_some_and(|a| a.events.is_some());
            let sending = self.in_flight > 0;
            if !inbox_live && !thread_live && !sending {
                return self.ctx.redirect_if_signed_out().map(ViewUpdate::Redirect);
            }

            let mut no_thread = None;
            let conversations = &mut self.events;
            let thread_events = match self.active.as_mut() {
                Some(active) => &mut active.events,
                None => &mut no_thread,
            };
            let sent_rx = &mut self.sent_rx;
            let event = tokio::select! {
                Some(event) = next_event(conversations), if inbox_live => {
                    InboxEvent::Conversations(event)
                }
                Some(event) = next_event(thread_events), if thread_live => InboxEvent::Thread(event),
                Some(outcome) = sent_rx.recv(), if sending => InboxEvent::Sent(outcome),
                // A channel closed; re-check what is still live.
                else => continue,
            };

            return Some(match event {
                InboxEvent::Conversations(event) => self.apply_conversations(event),
                InboxEvent::Thread(event) => self.apply_thread(event),
                InboxEvent::Sent(outcome) => {
                    self.in_flight -= 1;
                    self.apply_sent(outcome)
                }
            });
        }
    }

    fn apply_conversations(&mut self, event: PollEvent<Vec<ConversationSummary>>) -> ViewUpdate {
        match event {
            PollEvent::Snapshot(rows) => {
                let outcomes = self.conversations.observe_all(rows);
                self.notice = None;
                for (partner, outcome) in &outcomes {
                    if *outcome == Observation::EchoSuppressed {
                        tracing::debug!("[Inbox] {} preview lags the last send", partner);
                    }
                }
                ViewUpdate::Changed
            }
            PollEvent::Failed(err) => {
                let conversations = &mut self.conversations;
                note_poll_failure(
                    &err,
                    |reason| conversations.record_malformed(reason),
                    &mut self.notice,
                )
            }
            PollEvent::SessionExpired => ViewUpdate::Redirect(self.ctx.end_session()),
        }
    }

    fn apply_thread(&mut self, event: PollEvent<Vec<ChatMessage>>) -> ViewUpdate {
        let Some(active) = self.active.as_mut() else {
            return ViewUpdate::Unchanged;
        };
        match event {
            PollEvent::Snapshot(messages) => {
                active.malformed.reset();
                self.notice = None;
                let before = active.thread.messages().to_vec();
                let added = active.thread.merge(messages);
                if added > 0 {
                    tracing::debug!(
                        "[Inbox] {} new message(s) from {}",
                        added,
                        active.thread.partner_id()
                    );
                }
                if active.thread.messages() == before.as_slice() {
                    ViewUpdate::Unchanged
                } else {
                    ViewUpdate::Changed
                }
            }
            PollEvent::Failed(err) => {
                let malformed = &mut active.malformed;
                note_poll_failure(&err, |reason| malformed.record(reason), &mut self.notice)
            }
            PollEvent::SessionExpired => ViewUpdate::Redirect(self.ctx.end_session()),
        }
    }

    fn apply_sent(&mut self, outcome: SendOutcome) -> ViewUpdate {
        let SendOutcome {
            partner_id,
            local_id,
            result,
        } = outcome;
        let thread = self
            .active
            .as_mut()
            .map(|a| &mut a.thread)
            .filter(|t| t.partner_id() == partner_id);

        match result {
            Ok(receipt) => {
                if let Some(thread) = thread {
                    thread.acknowledge(local_id, receipt.message_id);
                }
                ViewUpdate::Changed
            }
            Err(err) if err.is_auth() => ViewUpdate::Redirect(self.ctx.end_session()),
            Err(err) => {
                let reason = err.user_message();
                tracing::warn!("[Inbox] Send to {} failed: {}", partner_id, err);
                if let Some(thread) = thread {
                    thread.mark_failed(local_id, reason.clone());
                }
                if err.is_validation() {
                    // The server will never show this message; restore the preview.
                    self.conversations.rollback(&partner_id);
                }
                self.send_error = Some(reason);
                ViewUpdate::Changed
            }
        }
    }

    pub fn view(&self) -> InboxView {
        let thread_error = self
            .active
            .as_ref()
            .and_then(|a| a.malformed.error())
            .map(String::from);
        InboxView {
            conversations: self.conversations.render_all(),
            active_partner: self.active_partner().map(String::from),
            messages: self
                .active
                .as_ref()
                .map(|a| a.thread.messages().to_vec())
                .unwrap_or_default(),
            error: self
                .conversations
                .malformed_error()
                .map(String::from)
                .or(thread_error)
                .or_else(|| self.send_error.clone())
                .or_else(|| self.notice.clone()),
        }
    }

    /// Stops the inbox and thread pollers.
    pub fn unmount(&mut self) {
        self.poll.stop();
        self.events = None;
        self.active = None;
    }
}
