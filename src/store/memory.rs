use super::StateStore;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Minimum time between full sweeps of expired entries
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Option<Instant>,
}

impl Entries {
    fn purge(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        self.next_sweep = Some(now + SWEEP_INTERVAL);
        before - self.map.len()
    }
}

/// In-process state store.
///
/// Expired entries are dropped when read, and writes sweep the whole map at
/// most once per minute so keys that are never read again do not pile up.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry
    pub async fn purge_expired(&self) -> usize {
        self.entries.write().await.purge(Instant::now())
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .map
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Entries held in memory, expired or not
    #[cfg(test)]
    async fn raw_len(&self) -> usize {
        self.entries.read().await.map.len()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
        };

        let mut entries = self.entries.write().await;
        if entries.next_sweep.map_or(true, |at| now >= at) {
            let purged = entries.purge(now);
            if purged > 0 {
                debug!("Purged {} expired entries", purged);
            }
        }
        entries.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // expired: remove it unless it was refreshed in the meantime
        let mut entries = self.entries.write().await;
        if entries.map.get(key).map_or(false, |entry| !entry.is_live(now)) {
            entries.map.remove(key);
        }
        Ok(None)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.map.remove(key);
        Ok(())
    }
}
