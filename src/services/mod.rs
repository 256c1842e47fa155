pub mod primary;
pub mod watchdog;

use chrono::Utc;
use tokio::sync::mpsc;

pub use primary::PrimaryPoller;
pub use watchdog::WatchdogPoller;

/// Channel carrying errors that must stop the process
pub type FatalSender = mpsc::UnboundedSender<anyhow::Error>;
pub type FatalReceiver = mpsc::UnboundedReceiver<anyhow::Error>;

pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    mpsc::unbounded_channel()
}

/// Current unix time minus `secs`, as a fractional timestamp
pub(crate) fn seconds_ago(secs: u64) -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0 - secs as f64
}
