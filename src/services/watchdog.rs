use super::{seconds_ago, FatalSender};
use crate::config::Config;
use crate::error;
use crate::frigate::{FetchWindow, FrigateClient};
use crate::notifier::{Notifier, NotifyMode};
use crate::pipeline::{DedupGate, EventFilter, MediaSet};
use crate::store::{Namespace, SharedStore};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Fast text-only loop with its own dedup namespace; events are handled one
/// at a time in fetch order
pub struct WatchdogPoller {
    client: FrigateClient,
    filter: EventFilter,
    gate: DedupGate,
    notifier: Arc<Notifier>,
    poll_interval: Duration,
    lookback_secs: u64,
    fatal: FatalSender,
}

impl WatchdogPoller {
    pub fn new(
        config: &Config,
        client: FrigateClient,
        store: SharedStore,
        notifier: Arc<Notifier>,
        fatal: FatalSender,
    ) -> Self {
        Self {
            client,
            filter: EventFilter::new(&config.filters),
            gate: DedupGate::new(store, Namespace::Watchdog),
            notifier,
            poll_interval: Duration::from_secs(config.watchdog.interval_secs),
            lookback_secs: config.watchdog.lookback_secs,
            fatal,
        }
    }

    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!(
            "Starting watchdog with interval of {} seconds",
            self.poll_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut interval = interval(self.poll_interval);

            loop {
                interval.tick().await;

                if let Err(e) = self.run_tick().await {
                    error!("Watchdog stopped on fatal error: {}", e);
                    let _ = self.fatal.send(e);
                    break;
                }
            }
        });

        Ok(())
    }

    /// Run one watchdog cycle; only fatal errors are returned
    pub async fn run_tick(&self) -> Result<usize> {
        let window = FetchWindow::Before(seconds_ago(self.lookback_secs));
        let events = match self.client.fetch_events(window).await {
            Ok(events) => events,
            Err(e) => {
                error!("Watchdog: {}", e);
                self.notifier
                    .report_error(&format!("Watchdog: {}", e))
                    .await;
                return Ok(0);
            }
        };

        let mut sent = 0;
        for event in self.filter.apply(events) {
            match self.gate.admit(&event.id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Watchdog already reported {}", event.id);
                    continue;
                }
                Err(e) => {
                    warn!("Watchdog error checking event {}: {}", event.id, e);
                    continue;
                }
            }

            let result = self
                .notifier
                .notify(&event, NotifyMode::TextOnly, Namespace::Watchdog, async {
                    MediaSet::default()
                })
                .await;
            match result {
                Ok(()) => sent += 1,
                Err(e) if error::kind_of(&e).is_fatal() => return Err(e),
                Err(e) => warn!("Watchdog failed to notify {}: {}", event.id, e),
            }
        }

        Ok(sent)
    }
}
