mod common;

use aura_application::{AnalysisResultController, InboxController, ViewUpdate};
use aura_core::access::ViewId;
use aura_core::chat::{ChatMessage, Delivery};
use aura_core::error::AuraError;
use aura_core::session::Role;
use chrono::Utc;
use common::{FakeApi, conversation, hours_ago, record, signed_in};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Processes inbox events until `after` has elapsed from `start`, or the
/// view redirects.
async fn run_until(inbox: &mut InboxController, start: Instant, after: Duration) -> Vec<ViewUpdate> {
    let deadline = start + after;
    let mut updates = Vec::new();
    loop {
        tokio::select! {
            update = inbox.process_next() => match update {
                Some(update @ ViewUpdate::Redirect(_)) => {
                    updates.push(update);
                    return updates;
                }
                Some(update) => updates.push(update),
                None => return updates,
            },
            _ = sleep_until(deadline) => return updates,
        }
    }
}

fn seeded_api() -> std::sync::Arc<FakeApi> {
    let api = FakeApi::new();
    let greeted = hours_ago(1);
    api.with(|s| {
        s.chats = vec![conversation("dr-1", "Chào bạn", greeted)];
        s.history = vec![ChatMessage::from_server("s1", false, "Chào bạn", greeted)];
    });
    api
}

#[tokio::test(start_paused = true)]
async fn test_urgent_message_survives_lagging_preview() {
    let api = seeded_api();
    let ctx = signed_in(api.clone(), Some(Role::User));
    let start = Instant::now();

    let mut inbox = InboxController::mount(ctx).unwrap();
    inbox.open_thread("dr-1");
    run_until(&mut inbox, start, Duration::from_millis(100)).await;
    assert_eq!(inbox.view().conversations[0].last_message, "Chào bạn");

    // Sent between two polls.
    inbox.send_message("Cần tư vấn gấp").unwrap();

    // The poll at t = 3000ms still returns the pre-send preview.
    run_until(&mut inbox, start, Duration::from_millis(3_500)).await;
    assert!(api.calls("list_chats") >= 2);
    assert_eq!(api.with(|s| s.sent.len()), 1);

    let view = inbox.view();
    assert_eq!(view.conversations[0].last_message, "Cần tư vấn gấp");
    let urgent: Vec<_> = view
        .messages
        .iter()
        .filter(|m| m.content == "Cần tư vấn gấp")
        .collect();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].delivery, Delivery::Delivered);
    assert!(view.error.is_none());

    // The server catches up.
    let now = Utc::now();
    api.with(|s| {
        s.chats = vec![conversation("dr-1", "Cần tư vấn gấp", now)];
        s.history
            .push(ChatMessage::from_server("s2", true, "Cần tư vấn gấp", now));
    });
    run_until(&mut inbox, start, Duration::from_millis(6_500)).await;

    let view = inbox.view();
    assert_eq!(view.conversations[0].last_message, "Cần tư vấn gấp");
    let contents: Vec<_> = view.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Chào bạn", "Cần tư vấn gấp"]);
    assert!(view.messages.iter().all(|m| !m.id.is_local()));
}

#[tokio::test(start_paused = true)]
async fn test_reply_replaces_preview_of_message_sent_before_first_poll() {
    let api = seeded_api();
    let ctx = signed_in(api.clone(), Some(Role::User));
    let start = Instant::now();

    let mut inbox = InboxController::mount(ctx).unwrap();
    inbox.open_thread("dr-1");
    // No snapshot processed yet.
    inbox.send_message("hi").unwrap();

    run_until(&mut inbox, start, Duration::from_millis(100)).await;
    assert_eq!(inbox.view().conversations[0].last_message, "hi");

    // The doctor answers after the send.
    let replied = Utc::now() + chrono::Duration::seconds(30);
    api.with(|s| {
        s.chats = vec![conversation("dr-1", "Bác sĩ đã trả lời", replied)];
        s.history
            .push(ChatMessage::from_server("s3", false, "Bác sĩ đã trả lời", replied));
    });
    run_until(&mut inbox, start, Duration::from_secs(10)).await;

    let view = inbox.view();
    assert_eq!(view.conversations[0].last_message, "Bác sĩ đã trả lời");
    assert_eq!(
        view.messages.last().map(|m| m.content.as_str()),
        Some("Bác sĩ đã trả lời")
    );
}

#[tokio::test(start_paused = true)]
async fn test_newer_reply_clears_pending_preview() {
    let api = seeded_api();
    let ctx = signed_in(api.clone(), Some(Role::User));
    let start = Instant::now();

    let mut inbox = InboxController::mount(ctx).unwrap();
    inbox.open_thread("dr-1");
    run_until(&mut inbox, start, Duration::from_millis(100)).await;

    inbox.send_message("Cần tư vấn gấp").unwrap();
    run_until(&mut inbox, start, Duration::from_millis(500)).await;
    assert_eq!(inbox.view().conversations[0].last_message, "Cần tư vấn gấp");

    let replied = Utc::now() + chrono::Duration::seconds(30);
    api.with(|s| s.chats = vec![conversation("dr-1", "Tôi sẽ gọi lại", replied)]);
    run_until(&mut inbox, start, Duration::from_millis(3_500)).await;

    let view = inbox.view();
    let preview = &view.conversations[0];
    assert_eq!(preview.last_message, "Tôi sẽ gọi lại");
    assert_eq!(preview.last_message_at, Some(replied));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_send_rolls_back_preview() {
    let api = seeded_api();
    api.with(|s| s.send_error = Some(AuraError::validation("Tin nhắn quá dài")));
    let ctx = signed_in(api.clone(), Some(Role::User));
    let start = Instant::now();

    let mut inbox = InboxController::mount(ctx).unwrap();
    inbox.open_thread("dr-1");
    run_until(&mut inbox, start, Duration::from_millis(100)).await;

    inbox.send_message("x".repeat(20).as_str()).unwrap();
    run_until(&mut inbox, start, Duration::from_millis(500)).await;

    let view = inbox.view();
    assert_eq!(view.conversations[0].last_message, "Chào bạn");
    let failed = view.messages.last().unwrap();
    assert_eq!(failed.delivery, Delivery::Failed("Tin nhắn quá dài".into()));
    assert_eq!(view.error.as_deref(), Some("Tin nhắn quá dài"));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_server_keeps_optimistic_preview() {
    let api = seeded_api();
    api.with(|s| s.send_error = Some(AuraError::connectivity("connection reset")));
    let ctx = signed_in(api.clone(), Some(Role::User));
    let start = Instant::now();

    let mut inbox = InboxController::mount(ctx).unwrap();
    inbox.open_thread("dr-1");
    run_until(&mut inbox, start, Duration::from_millis(100)).await;

    inbox.send_message("Tôi bị mờ mắt").unwrap();
    run_until(&mut inbox, start, Duration::from_millis(3_500)).await;

    let view = inbox.view();
    assert_eq!(view.conversations[0].last_message, "Tôi bị mờ mắt");
    assert!(matches!(
        view.messages.last().unwrap().delivery,
        Delivery::Failed(_)
    ));
    assert_eq!(
        view.error.as_deref(),
        Some("Unable to reach the server. Please try again.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_blank_message_is_not_sent() {
    let api = seeded_api();
    let ctx = signed_in(api.clone(), Some(Role::User));
    let mut inbox = InboxController::mount(ctx).unwrap();
    inbox.open_thread("dr-1");

    assert!(inbox.send_message("   ").unwrap_err().is_validation());
    inbox.close_thread();
    assert!(inbox.send_message("hi").unwrap_err().is_validation());
    assert_eq!(api.calls("send_message"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_rejected_session_stops_every_poller() {
    let api = seeded_api();
    api.with(|s| s.records = vec![record("r1", "PENDING", None)]);
    let ctx = signed_in(api.clone(), Some(Role::User));
    let start = Instant::now();

    let mut inbox = InboxController::mount(ctx.clone()).unwrap();
    inbox.open_thread("dr-1");
    let analysis = AnalysisResultController::mount(ctx.clone(), "r1").unwrap();
    run_until(&mut inbox, start, Duration::from_millis(100)).await;
    assert!(analysis.is_polling());

    // Token revoked server-side.
    api.with(|s| s.valid_token = "revoked".to_string());
    let updates = run_until(&mut inbox, start, Duration::from_secs(10)).await;
    assert!(updates.contains(&ViewUpdate::Redirect(ViewId::Login)));
    assert!(!ctx.session().is_authenticated());
    assert!(!analysis.is_polling());

    let counts = || {
        (
            api.calls("list_chats"),
            api.calls("chat_history"),
            api.calls("get_record"),
        )
    };
    let at_expiry = counts();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(counts(), at_expiry);
}
