pub mod client;
pub mod models;

pub use client::{FetchWindow, FrigateClient};
pub use models::Event;
