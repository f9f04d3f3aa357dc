//! Feed synchronization: polling, diffing, catalog updates and fan-out.

mod config;
mod engine;
mod scheduler;
mod types;

pub use config::SyncConfig;
pub use engine::{FeedSyncEngine, SyncComponents};
pub use scheduler::SyncScheduler;
pub use types::{CycleReport, SyncError};
