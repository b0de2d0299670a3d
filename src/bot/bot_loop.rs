//! Main event loop: one task per inbound event, periodic session sweep,
//! graceful shutdown on Ctrl+C.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tracing::{error, info};

use crate::channels::{ChannelManager, IncomingMessage, StatusUpdate};
use crate::config::BotConfig;
use crate::error::Error;

use super::Bot;

/// Run until Ctrl+C or until every channel stream ends.
pub async fn run(bot: Arc<Bot>, channels: Arc<ChannelManager>, config: &BotConfig) -> Result<(), Error> {
    let mut message_stream = channels.start_all().await?;

    let sweeper = bot.clone();
    let max_idle = config.session_idle_timeout;
    let sweep_every = config.session_sweep_interval;
    let pruning_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;
            let evicted = sweeper.dialogue().prune_stale(max_idle, Utc::now()).await;
            if evicted > 0 {
                info!(evicted, "Evicted idle dialogue sessions");
            }
        }
    });

    info!("Bot {} ready and listening", config.name);

    loop {
        let message = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
                break;
            }
            msg = message_stream.next() => {
                match msg {
                    Some(m) => m,
                    None => {
                        info!("All channel streams ended, shutting down...");
                        break;
                    }
                }
            }
        };

        let bot = bot.clone();
        let channels = channels.clone();
        tokio::spawn(async move {
            dispatch(&bot, &channels, message).await;
        });
    }

    pruning_handle.abort();
    channels.shutdown_all().await;
    Ok(())
}

/// Handle one event and deliver every reply on the channel it came from.
pub async fn dispatch(bot: &Bot, channels: &ChannelManager, message: IncomingMessage) {
    let handled = bot.handle_message(&message).await;

    for response in handled.responses {
        if let Err(e) = channels.respond(&message, response).await {
            error!(user_id = message.user_id, error = %e, "Failed to send response");
        }
    }

    let Some(order) = handled.order else {
        return;
    };

    let _ = channels
        .send_status(
            &message.channel,
            StatusUpdate::Thinking("Generating your meal plan...".into()),
            &message.metadata,
        )
        .await;

    let response = bot.generate(&order, Utc::now()).await;
    if let Err(e) = channels.respond(&message, response).await {
        error!(user_id = message.user_id, error = %e, "Failed to deliver meal plan");
    }
}
