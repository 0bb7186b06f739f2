//! Gatherbox: a streaming search aggregation engine
//!
//! The core of a launcher-style command palette: schedules concurrent
//! provider calls across latency tiers, enforces per-tier timeouts and
//! concurrency caps, merges and ranks incoming items, and batches them into
//! flicker-free streamed updates with cooperative cancellation.

pub mod config;
pub mod error;
pub mod providers;
pub mod query;
pub mod results;
pub mod search;

pub use config::Settings;
pub use error::SearchError;
pub use providers::{QueueAffinity, SearchProvider};
pub use query::Query;
pub use results::{Item, SearchOutcome, SourceStat, SourceStatus, Update};
pub use search::{GatherController, SearchEngine, SearchHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
