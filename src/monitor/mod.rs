//! Traffic accounting.
//!
//! - [`TrafficMonitor`] - per-key connection and request statistics
//! - [`TrafficInfo`] - one key's record
//! - [`TrafficSnapshot`] - serializable export view
//! - [`spawn_sweeper`] - periodic idle-entry eviction

mod info;
mod snapshot;
mod sweeper;
mod traffic;

pub use info::{RequestOutcome, TrafficInfo};
pub use snapshot::{HostStats, TrafficSnapshot};
pub use sweeper::{spawn_sweeper, SweeperHandle};
pub(crate) use sweeper::periodic;
pub use traffic::{TrafficKey, TrafficMonitor, DEFAULT_GC_INTERVAL};
