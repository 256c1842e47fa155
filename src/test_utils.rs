//! Shared fakes for the chat channel and the state store.

use crate::error::Error;
use crate::messaging::{Messenger, SendOptions};
use crate::pipeline::media::{MediaAsset, MediaKind};
use crate::store::StateStore;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

/// One message captured by [`RecordingMessenger`]
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        text: String,
        silent: bool,
    },
    Media {
        kinds: Vec<MediaKind>,
        caption: String,
        silent: bool,
    },
}

impl Sent {
    pub fn body(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
            Self::Media { caption, .. } => caption,
        }
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl RecordingMessenger {
    /// A messenger whose every send fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    /// Messages whose body contains `needle`
    pub async fn matching(&self, needle: &str) -> Vec<Sent> {
        self.sent()
            .await
            .into_iter()
            .filter(|s| s.body().contains(needle))
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, text: &str, options: SendOptions) -> Result<()> {
        if self.fail {
            return Err(Error::Messaging("chat unavailable".to_string()).into());
        }
        self.sent.lock().await.push(Sent::Text {
            text: text.to_string(),
            silent: options.silent,
        });
        Ok(())
    }

    async fn send_media(
        &self,
        media: &[MediaAsset],
        caption: &str,
        options: SendOptions,
    ) -> Result<()> {
        if self.fail {
            return Err(Error::Messaging("chat unavailable".to_string()).into());
        }
        self.sent.lock().await.push(Sent::Media {
            kinds: media.iter().map(|m| m.kind).collect(),
            caption: caption.to_string(),
            silent: options.silent,
        });
        Ok(())
    }
}

/// A store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl StateStore for FailingStore {
    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<()> {
        Err(Error::Store("connection refused".to_string()).into())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::Store("connection refused".to_string()).into())
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Err(Error::Store("connection refused".to_string()).into())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::Store("connection refused".to_string()).into())
    }
}
