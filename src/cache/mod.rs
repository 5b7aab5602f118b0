//! In-memory generational cache engine
//!
//! This module knows nothing about authentication. It provides the
//! three-generation [`Cache`] used by the authentication layer, the
//! [`EvictionListener`] hook and the [`CacheStats`] snapshot.

pub mod entry;
pub mod generational;
pub mod listener;
pub mod stats;

pub use entry::*;
pub use generational::*;
pub use listener::*;
pub use stats::*;
