//! Application state shared across all request handlers.

use hookrelay_core::events::NotificationEventSender;
use hookrelay_core::normalizer::Normalizer;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc or
/// is itself a handle).
#[derive(Clone)]
pub struct AppState {
    /// Verifies and normalizes inbound webhooks.
    pub normalizer: Arc<Normalizer>,
    /// Hands normalized events to the delivery worker.
    pub events: NotificationEventSender,
}

impl AppState {
    pub fn new(normalizer: Normalizer, events: NotificationEventSender) -> Self {
        Self {
            normalizer: Arc::new(normalizer),
            events,
        }
    }
}
