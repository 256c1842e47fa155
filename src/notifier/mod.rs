pub mod format;

use crate::config::Config;
use crate::error::Error;
use crate::frigate::Event;
use crate::messaging::{SendOptions, SharedMessenger};
use crate::pipeline::media::MediaSet;
use crate::store::{ControlFlags, DeliveryState, Namespace, SharedStore};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::future::Future;
use std::time::Duration;

/// Shape of the message sent for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// Full caption plus whatever media could be assembled
    Rich,
    /// Short single-line text, media ignored
    TextOnly,
}

impl NotifyMode {
    /// Marker recorded once the notification went out.
    ///
    /// Text-only notices are sent once per event, so they always close the
    /// event; rich ones stay open until the finished form was delivered.
    pub fn terminal_state(&self, event: &Event) -> DeliveryState {
        match self {
            NotifyMode::Rich => event.delivery_state(),
            NotifyMode::TextOnly => DeliveryState::Finished,
        }
    }
}

/// Formats and sends event notifications and records their delivery state
pub struct Notifier {
    messenger: SharedMessenger,
    store: SharedStore,
    flags: ControlFlags,
    external_url: String,
    claim_ttl: Duration,
    event_ttl: Duration,
}

impl Notifier {
    pub fn new(messenger: SharedMessenger, store: SharedStore, config: &Config) -> Self {
        Self {
            messenger,
            flags: ControlFlags::new(store.clone()),
            store,
            external_url: config.frigate.external_url.clone(),
            claim_ttl: Duration::from_secs(config.store.claim_ttl_secs),
            event_ttl: Duration::from_secs(config.store.event_ttl_secs),
        }
    }

    /// Claim, resolve media, deliver and record the final state.
    ///
    /// `media` is only awaited once the claim is in place. A failed send
    /// leaves the short-lived claim to expire so a later tick retries; a
    /// failed state write is returned as a fatal `Error::Store`.
    pub async fn notify<F>(
        &self,
        event: &Event,
        mode: NotifyMode,
        namespace: Namespace,
        media: F,
    ) -> Result<()>
    where
        F: Future<Output = MediaSet> + Send,
    {
        self.claim(event, namespace).await?;

        let media = media.await;
        for failure in &media.failures {
            self.report_error(&format!("Media unavailable: {}", failure))
                .await;
        }

        if let Err(e) = self.deliver(event, &media, mode).await {
            error!("Error sending notification for {}: {}", event.id, e);
            self.report_error(&format!("Error sending notification for event {}: {}", event.id, e))
                .await;
            return Err(e);
        }

        self.complete(event, mode, namespace).await?;
        // temporary media files are removed here, after the send
        drop(media);
        Ok(())
    }

    /// Write the short-lived InWork marker
    pub async fn claim(&self, event: &Event, namespace: Namespace) -> Result<()> {
        self.write_state(event, namespace, DeliveryState::InWork, self.claim_ttl)
            .await
    }

    /// Write the long-lived marker for a delivered notification
    pub async fn complete(&self, event: &Event, mode: NotifyMode, namespace: Namespace) -> Result<()> {
        self.write_state(event, namespace, mode.terminal_state(event), self.event_ttl)
            .await
    }

    async fn write_state(
        &self,
        event: &Event,
        namespace: Namespace,
        state: DeliveryState,
        ttl: Duration,
    ) -> Result<()> {
        let key = namespace.key(&event.id);
        self.store
            .set(&key, state.as_str(), Some(ttl))
            .await
            .map_err(|e| Error::Store(format!("Failed to mark {} as {}: {}", key, state, e)))?;
        debug!("Marked {} as {}", key, state);
        Ok(())
    }

    /// Send the notification for one event
    pub async fn deliver(&self, event: &Event, media: &MediaSet, mode: NotifyMode) -> Result<()> {
        let options = SendOptions {
            silent: self.is_muted().await,
        };

        match mode {
            NotifyMode::TextOnly => {
                let text = format::short_message(event);
                self.messenger.send_text(&text, options).await?;
            }
            NotifyMode::Rich => {
                let caption = format::full_message(event, &self.external_url);
                if media.is_empty() {
                    warn!("No media for event {}, sending text only", event.id);
                    self.messenger.send_text(&caption, options).await?;
                } else {
                    self.messenger
                        .send_media(media.assets(), &caption, options)
                        .await?;
                }
            }
        }

        info!(
            "Sent {:?} notification for event {} ({} {})",
            mode, event.id, event.camera, event.label
        );
        Ok(())
    }

    async fn is_muted(&self) -> bool {
        match self.flags.is_muted().await {
            Ok(muted) => muted,
            Err(e) => {
                warn!("Error reading mute flag, sending with sound: {}", e);
                false
            }
        }
    }

    /// Push an operator-facing error summary to the chat
    pub async fn report_error(&self, text: &str) {
        if let Err(e) = self.messenger.send_text(text, SendOptions::default()).await {
            error!("Error reporting to chat: {}", e);
        }
    }
}
