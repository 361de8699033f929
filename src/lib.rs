// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod poller;
pub mod status;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::diff::{diff, merge, TransitionEvent, TransitionKind};
pub use crate::model::{ListingRecord, Snapshot, Tier};
pub use crate::poller::{CycleOutcome, FailureStreak, PollLoop, PollSettings};
pub use crate::store::{SnapshotHandle, SnapshotStore};
