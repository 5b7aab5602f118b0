pub mod metrics;

pub use metrics::{CacheTier, FallbackReason};
