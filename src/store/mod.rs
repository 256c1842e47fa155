pub mod flags;
pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub use flags::ControlFlags;
pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Key/value store with per-key expiry
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Set a key, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Get the current value of a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Check whether a key is present
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remove a key; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn StateStore>;

/// Per-event delivery marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Claimed, notification in flight
    InWork,
    /// Notified while the event was still running
    InProgress,
    /// Notified in its finished form
    Finished,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InWork => "InWork",
            Self::InProgress => "InProgress",
            Self::Finished => "Finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "InWork" => Some(Self::InWork),
            "InProgress" => Some(Self::InProgress),
            "Finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

impl Display for DeliveryState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key namespace separating the two poll loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Primary,
    Watchdog,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Primary => "",
            Self::Watchdog => "WatchDog_",
        }
    }

    /// Store key for an event in this namespace
    pub fn key(&self, event_id: &str) -> String {
        format!("{}{}", self.prefix(), event_id)
    }
}
