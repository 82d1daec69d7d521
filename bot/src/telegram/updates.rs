//! Long-poll loop feeding chat commands into the `CommandHandler`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use common::shutdown::Shutdown;
use subscribers::Subscriber;

use super::client::TelegramClient;
use super::types::Message;
use crate::commands::{Command, CommandHandler, Invocation};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Builds the handler input from an incoming message; `None` when the
/// message is not a known command.
pub fn invocation_from(msg: &Message) -> Option<(Command, Invocation)> {
    let cmd = Command::parse(msg.text.as_deref()?)?;

    let chat = Subscriber::new(msg.chat.id, msg.chat.display_name());
    let sender = msg
        .from
        .as_ref()
        .map(|u| Subscriber::new(u.id, u.handle()));
    let sender_handle = msg
        .from
        .as_ref()
        .map(|u| u.handle())
        .unwrap_or_else(|| chat.display_name.clone());

    Some((
        cmd,
        Invocation {
            chat,
            sender,
            sender_handle,
        },
    ))
}

pub async fn run_update_loop(
    client: TelegramClient,
    handler: Arc<CommandHandler>,
    long_poll: Duration,
    shutdown: Shutdown,
) {
    let stop = shutdown.wait();
    tokio::pin!(stop);

    let mut offset: i64 = 0;
    info!("command loop started");

    loop {
        let batch = tokio::select! {
            _ = &mut stop => break,
            res = client.get_updates(offset, long_poll) => res,
        };

        let updates = match batch {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "getUpdates failed; backing off");
                tokio::select! {
                    _ = &mut stop => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(msg) = update.message else { continue };
            let Some((cmd, inv)) = invocation_from(&msg) else {
                continue;
            };

            debug!(?cmd, chat_id = inv.chat.id, "command received");

            // Commands run concurrently; a forced broadcast must not stall the loop.
            let handler = Arc::clone(&handler);
            let client = client.clone();
            tokio::spawn(async move {
                let chat_id = inv.chat.id;
                if let Some(reply) = handler.handle(cmd, inv).await {
                    if let Err(e) = client.send_message(chat_id, &reply).await {
                        warn!(chat_id, error = %e, "reply not delivered");
                    }
                }
            });
        }
    }

    info!("command loop stopped");
}
