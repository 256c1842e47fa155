use super::SharedStore;
use anyhow::Result;
use log::info;

/// Key present while event delivery is suppressed
pub const SUPPRESS_KEY: &str = "FrigateTelegramStopSendEventMessage";
/// Key present while notifications are delivered silently
pub const MUTE_KEY: &str = "FrigateTelegramMuteEventMessage";

/// Global pause / mute switches, stored as key presence without expiry
#[derive(Clone)]
pub struct ControlFlags {
    store: SharedStore,
}

impl ControlFlags {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// True while the primary loop must skip fetching and notifying
    pub async fn is_suppressed(&self) -> Result<bool> {
        self.store.exists(SUPPRESS_KEY).await
    }

    pub async fn set_suppressed(&self, suppressed: bool) -> Result<()> {
        self.set_flag(SUPPRESS_KEY, suppressed).await?;
        info!("Event delivery {}", if suppressed { "stopped" } else { "resumed" });
        Ok(())
    }

    /// True while notifications should be sent without sound
    pub async fn is_muted(&self) -> Result<bool> {
        self.store.exists(MUTE_KEY).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.set_flag(MUTE_KEY, muted).await?;
        info!("Event notifications {}", if muted { "muted" } else { "unmuted" });
        Ok(())
    }

    async fn set_flag(&self, key: &str, on: bool) -> Result<()> {
        if on {
            self.store.set(key, "1", None).await
        } else {
            self.store.delete(key).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_flags_are_independent() -> Result<()> {
        let flags = ControlFlags::new(Arc::new(MemoryStore::new()));
        assert!(!flags.is_suppressed().await?);
        assert!(!flags.is_muted().await?);

        flags.set_suppressed(true).await?;
        assert!(flags.is_suppressed().await?);
        assert!(!flags.is_muted().await?);

        flags.set_muted(true).await?;
        flags.set_suppressed(false).await?;
        assert!(!flags.is_suppressed().await?);
        assert!(flags.is_muted().await?);

        flags.set_muted(false).await?;
        assert!(!flags.is_muted().await?);
        Ok(())
    }
}
