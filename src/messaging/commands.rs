use super::telegram::{TelegramClient, Update};
use super::{Messenger, SendOptions};
use crate::store::ControlFlags;
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

const STORE_ERROR_TEXT: &str = "Error setting value, check logs.";
const UNKNOWN_COMMAND_TEXT: &str = "I don't know that command";

/// Extract the command name from a message such as `/stop@my_bot now`
pub fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let command = command.split('@').next().unwrap_or(command);
    if command.is_empty() {
        None
    } else {
        Some(command)
    }
}

/// Answers chat commands that pause, resume, mute and unmute delivery
pub struct CommandBot {
    client: Arc<TelegramClient>,
    flags: ControlFlags,
    updates_timeout_secs: u64,
}

impl CommandBot {
    pub fn new(client: Arc<TelegramClient>, flags: ControlFlags, updates_timeout_secs: u64) -> Self {
        Self {
            client,
            flags,
            updates_timeout_secs,
        }
    }

    /// Start the long-poll loop in the background
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!("Starting chat command listener for chat {}", self.client.chat_id());

        tokio::spawn(async move {
            let mut offset = 0;
            loop {
                match self
                    .client
                    .get_updates(offset, self.updates_timeout_secs)
                    .await
                {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            if let Err(e) = self.handle_update(&update).await {
                                error!("Error answering command: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Error polling chat commands: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        Ok(())
    }

    /// Reply to one update if it is a command from the configured chat
    pub async fn handle_update(&self, update: &Update) -> Result<()> {
        let Some(message) = &update.message else {
            return Ok(());
        };
        if message.chat.id != self.client.chat_id() {
            debug!("Ignoring message from chat {}", message.chat.id);
            return Ok(());
        }
        let Some(command) = message.text.as_deref().and_then(parse_command) else {
            return Ok(());
        };

        let reply = self.reply_to(command).await;
        self.client.send_text(&reply, SendOptions::default()).await
    }

    /// Text answering a command, applying its effect first
    pub async fn reply_to(&self, command: &str) -> String {
        match command {
            "help" => self.help(),
            "ping" => "pong".to_string(),
            "pong" => "ping".to_string(),
            "king" => "kong".to_string(),
            "status" => self.status().await,
            "stop" => Self::outcome(self.flags.set_suppressed(true).await, "Stop send message."),
            "resume" => Self::outcome(self.flags.set_suppressed(false).await, "Resume send message."),
            "mute" => Self::outcome(self.flags.set_muted(true).await, "Mute send message."),
            "unmute" => Self::outcome(self.flags.set_muted(false).await, "Unmute send message."),
            _ => UNKNOWN_COMMAND_TEXT.to_string(),
        }
    }

    fn outcome(result: Result<()>, success: &str) -> String {
        match result {
            Ok(()) => success.to_string(),
            Err(e) => {
                error!("Error updating control flag: {}", e);
                STORE_ERROR_TEXT.to_string()
            }
        }
    }

    fn help(&self) -> String {
        format!(
            "Stop send events: /stop\n\
             Resume send events: /resume\n\
             Mute send events: /mute\n\
             Unmute send events: /unmute\n\
             Current status: /status\n\
             Commands work only in chat id: `{}` (current chat)",
            self.client.chat_id()
        )
    }

    async fn status(&self) -> String {
        match (self.flags.is_suppressed().await, self.flags.is_muted().await) {
            (Ok(suppressed), Ok(muted)) => {
                format!("Send event: `{}`\nMute event: `{}`\n", !suppressed, muted)
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("Error reading control flags: {}", e);
                STORE_ERROR_TEXT.to_string()
            }
        }
    }
}
