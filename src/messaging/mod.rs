pub mod commands;
pub mod telegram;
#[cfg(test)]
mod tests;

use crate::pipeline::media::MediaAsset;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use commands::CommandBot;
pub use telegram::TelegramClient;

/// Per-message delivery options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Deliver without an alert sound
    pub silent: bool,
}

/// Chat channel notifications are delivered to
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain Markdown message
    async fn send_text(&self, text: &str, options: SendOptions) -> Result<()>;

    /// Send one message carrying all media, captioned on the first item
    async fn send_media(
        &self,
        media: &[MediaAsset],
        caption: &str,
        options: SendOptions,
    ) -> Result<()>;
}

pub type SharedMessenger = Arc<dyn Messenger>;
