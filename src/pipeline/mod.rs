pub mod dedup;
pub mod filter;
pub mod media;

pub use dedup::DedupGate;
pub use filter::EventFilter;
pub use media::{MediaAssembler, MediaAsset, MediaKind, MediaSet};
