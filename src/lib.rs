pub mod api;
pub mod config;
pub mod error;
pub mod frigate;
pub mod messaging;
pub mod notifier;
pub mod pipeline;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::Error;
