use crate::store::{DeliveryState, Namespace, SharedStore};
use anyhow::Result;
use log::{debug, warn};

/// Read-only check deciding whether an event still needs a notification.
///
/// Claims and final markers are written by the notifier, never here. Two
/// overlapping ticks can both pass the gate before either claim lands; that
/// duplicate is accepted rather than guarded by a lock.
#[derive(Clone)]
pub struct DedupGate {
    store: SharedStore,
    namespace: Namespace,
}

impl DedupGate {
    pub fn new(store: SharedStore, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// True when nothing is recorded for the event or it was only announced
    /// while still running
    pub async fn admit(&self, event_id: &str) -> Result<bool> {
        let key = self.namespace.key(event_id);
        let Some(value) = self.store.get(&key).await? else {
            debug!("Found new event {}", key);
            return Ok(true);
        };

        match DeliveryState::parse(&value) {
            Some(DeliveryState::InProgress) => Ok(true),
            Some(DeliveryState::InWork) | Some(DeliveryState::Finished) => Ok(false),
            None => {
                warn!("Unknown delivery state {:?} for {}, skipping", value, key);
                Ok(false)
            }
        }
    }
}
