//! Long-running processors.
//!
//! - `FeedPoller`: polls feeds, emits `NotificationEvent` for new items
//! - `DeliveryWorker`: receives `NotificationEvent`, formats and dispatches it

pub mod delivery_worker;
pub mod feed_poller;

pub use delivery_worker::DeliveryWorker;
pub use feed_poller::{CycleReport, FeedPoller, PollPhase};
