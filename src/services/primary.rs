use super::{seconds_ago, FatalSender};
use crate::config::Config;
use crate::error::{self, Error};
use crate::frigate::{Event, FetchWindow, FrigateClient};
use crate::notifier::{Notifier, NotifyMode};
use crate::pipeline::{DedupGate, EventFilter, MediaAssembler};
use crate::store::{ControlFlags, Namespace, SharedStore};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// Rich-notification loop.
///
/// Every tick fetches events that started within the lookback window and
/// spawns one independent delivery task per admitted event.
pub struct PrimaryPoller {
    client: FrigateClient,
    filter: EventFilter,
    gate: DedupGate,
    flags: ControlFlags,
    notifier: Arc<Notifier>,
    assembler: Arc<MediaAssembler>,
    poll_interval: Duration,
    lookback_secs: u64,
    max_decode_failures: u32,
    decode_failures: AtomicU32,
    fatal: FatalSender,
}

impl PrimaryPoller {
    pub fn new(
        config: &Config,
        client: FrigateClient,
        store: SharedStore,
        notifier: Arc<Notifier>,
        fatal: FatalSender,
    ) -> Self {
        Self {
            assembler: Arc::new(MediaAssembler::new(client.clone(), &config.pipeline)),
            client,
            filter: EventFilter::new(&config.filters),
            gate: DedupGate::new(store.clone(), Namespace::Primary),
            flags: ControlFlags::new(store),
            notifier,
            poll_interval: Duration::from_secs(config.pipeline.poll_interval_secs),
            lookback_secs: config.pipeline.lookback_secs,
            max_decode_failures: config.pipeline.max_decode_failures,
            decode_failures: AtomicU32::new(0),
            fatal,
        }
    }

    /// Start the poll loop in the background
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!(
            "Starting event poller with interval of {} seconds",
            self.poll_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut interval = interval(self.poll_interval);

            loop {
                interval.tick().await;
                // deliveries are fire-and-forget
                let _ = self.run_tick().await;
            }
        });

        Ok(())
    }

    /// Run one poll cycle, returning the spawned delivery tasks
    pub async fn run_tick(&self) -> Vec<JoinHandle<()>> {
        match self.flags.is_suppressed().await {
            Ok(true) => {
                debug!("Event delivery is stopped, skipping poll");
                return Vec::new();
            }
            Ok(false) => {}
            Err(e) => {
                error!("Error reading stop flag, skipping poll: {}", e);
                return Vec::new();
            }
        }

        let events = self.fetch().await;
        let events = self.filter.apply(events);

        let mut handles = Vec::new();
        for event in events {
            match self.gate.admit(&event.id).await {
                Ok(true) => handles.push(self.dispatch(event)),
                Ok(false) => debug!("Event {} already handled", event.id),
                Err(e) => warn!("Error checking state of event {}: {}", event.id, e),
            }
        }

        if !handles.is_empty() {
            info!("Dispatched {} event notifications", handles.len());
        }
        handles
    }

    async fn fetch(&self) -> Vec<Event> {
        let window = FetchWindow::After(seconds_ago(self.lookback_secs));
        match self.client.fetch_events(window).await {
            Ok(events) => {
                self.decode_failures.store(0, Ordering::Relaxed);
                events
            }
            Err(e) => {
                error!("{}", e);
                self.notifier.report_error(&e.to_string()).await;
                self.count_decode_failure(&e);
                Vec::new()
            }
        }
    }

    fn count_decode_failure(&self, err: &anyhow::Error) {
        if !matches!(err.downcast_ref::<Error>(), Some(Error::Decode(_))) {
            return;
        }

        let failures = self.decode_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.max_decode_failures {
            let fatal = Error::Integration(format!(
                "{} consecutive malformed event responses",
                failures
            ));
            let _ = self.fatal.send(fatal.into());
        }
    }

    fn dispatch(&self, event: Event) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        let assembler = self.assembler.clone();
        let fatal = self.fatal.clone();

        tokio::spawn(async move {
            let media = assembler.assemble(&event);
            let result = notifier
                .notify(&event, NotifyMode::Rich, Namespace::Primary, media)
                .await;
            if let Err(e) = result {
                if error::kind_of(&e).is_fatal() {
                    let _ = fatal.send(e);
                }
            }
        })
    }
}
