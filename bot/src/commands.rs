//! Chat commands and what they do to the core.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use market::AssetBook;
use scheduler::message::render_medians;
use scheduler::{BroadcastScheduler, Trigger};
use subscribers::{Subscriber, SubscriberRegistry};

use crate::on_demand::OnDemandRequest;
use crate::time::now_local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Subscribe,
    Unsubscribe,
    Update,
    Median,
    Hello,
    Broadcast,
}

impl Command {
    /// Parses the first word of `text`; `/cmd@botname` is accepted.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "subscribe" => Some(Self::Subscribe),
            "unsubscribe" => Some(Self::Unsubscribe),
            "update" => Some(Self::Update),
            "median" => Some(Self::Median),
            "hello" => Some(Self::Hello),
            "broadcast" => Some(Self::Broadcast),
            _ => None,
        }
    }
}

/// Who sent a command and where.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub chat: Subscriber,
    /// Absent for channel posts.
    pub sender: Option<Subscriber>,
    /// How the reply addresses the sender.
    pub sender_handle: String,
}

pub struct CommandHandler {
    chats: Arc<SubscriberRegistry>,
    users: Arc<SubscriberRegistry>,
    book: Arc<AssetBook>,
    scheduler: Arc<BroadcastScheduler>,
    on_demand_tx: mpsc::Sender<OnDemandRequest>,
    admin_ids: HashSet<i64>,
}

impl CommandHandler {
    pub fn new(
        chats: Arc<SubscriberRegistry>,
        users: Arc<SubscriberRegistry>,
        book: Arc<AssetBook>,
        scheduler: Arc<BroadcastScheduler>,
        on_demand_tx: mpsc::Sender<OnDemandRequest>,
        admin_ids: HashSet<i64>,
    ) -> Self {
        Self {
            chats,
            users,
            book,
            scheduler,
            on_demand_tx,
            admin_ids,
        }
    }

    /// Applies `cmd` and returns the reply text, if any.
    pub async fn handle(&self, cmd: Command, inv: Invocation) -> Option<String> {
        let who = &inv.sender_handle;

        match cmd {
            Command::Start => {
                self.chats.add_subscriber(inv.chat.clone()).await;
                if let Some(sender) = inv.sender.clone() {
                    self.users.add_subscriber(sender).await;
                }
                Some(format!(
                    "Hi, {who}!\nI'm going to send you price update daily"
                ))
            }
            Command::Subscribe => {
                self.chats.add_subscriber(inv.chat.clone()).await;
                Some(format!(
                    "Hi, {who}!\nI'm going to send price updates daily to this chat"
                ))
            }
            Command::Unsubscribe => {
                self.chats.remove_subscriber(inv.chat.id).await;
                Some(format!("Hey, {who}!\nThis chat was unsubscribed"))
            }
            Command::Update => {
                let req = OnDemandRequest {
                    subscriber: inv.chat.clone(),
                };
                match self.on_demand_tx.try_send(req) {
                    Ok(()) => None,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(chat_id = inv.chat.id, "on-demand queue full");
                        Some("Busy right now, please try again in a minute".to_string())
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!(chat_id = inv.chat.id, "on-demand worker is gone");
                        None
                    }
                }
            }
            Command::Median => Some(render_medians(&self.book.medians())),
            Command::Hello => Some("Morning".to_string()),
            Command::Broadcast => {
                let allowed = inv
                    .sender
                    .as_ref()
                    .is_some_and(|s| self.admin_ids.contains(&s.id));
                if !allowed {
                    warn!(chat_id = inv.chat.id, "forced broadcast refused");
                    return None;
                }

                let report = self.scheduler.evaluate(Trigger::Forced, now_local()).await;
                info!(delivered = report.delivered, "forced broadcast by operator");
                Some(format!(
                    "Broadcast delivered to {} chat(s), {} failed, {} pruned",
                    report.delivered,
                    report.transient_failures,
                    report.pruned.len()
                ))
            }
        }
    }
}
