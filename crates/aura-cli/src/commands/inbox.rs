use super::{LiveView, redirected, watch};
use anyhow::Result;
use aura_application::{AppContext, InboxController, ViewUpdate};
use aura_core::chat::Delivery;
use std::sync::Arc;
use std::time::Duration;

impl LiveView for InboxController {
    async fn next_update(&mut self) -> Option<ViewUpdate> {
        self.process_next().await
    }

    fn print(&self) {
        let view = self.view();
        println!("\nConversations:");
        for c in &view.conversations {
            let unread = if c.unread > 0 {
                format!(" ({} unread)", c.unread)
            } else {
                String::new()
            };
            println!("  {:<10} {}{}: {}", c.partner_id, c.partner_name, unread, c.last_message);
        }
        if let Some(partner) = &view.active_partner {
            println!("Thread with {}:", partner);
            for message in &view.messages {
                let who = if message.sender_is_self { "me" } else { "them" };
                let state = match &message.delivery {
                    Delivery::Sending => " [sending]".to_string(),
                    Delivery::Delivered => String::new(),
                    Delivery::Failed(reason) => format!(" [failed: {}]", reason),
                };
                println!(
                    "  {} {:>4}: {}{}",
                    message.timestamp.format("%H:%M"),
                    who,
                    message.content,
                    state
                );
            }
        }
        if let Some(error) = &view.error {
            println!("⚠️  {}", error);
        }
    }
}

pub async fn run(
    ctx: Arc<AppContext>,
    partner: Option<&str>,
    send: Option<&str>,
    watch_secs: u64,
) -> Result<()> {
    let mut inbox = InboxController::mount(ctx).map_err(redirected)?;
    if let Some(partner) = partner {
        inbox.open_thread(partner);
    }
    if let Some(content) = send {
        inbox.send_message(content)?;
        inbox.print();
    }
    watch(&mut inbox, Some(Duration::from_secs(watch_secs))).await?;
    inbox.unmount();
    Ok(())
}
