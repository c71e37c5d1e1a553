//! Event channels between the intake side and delivery.
//!
//! # Event Flow
//!
//! 1. Webhook handlers normalize a request and send the `NotificationEvent`
//! 2. `FeedPoller` sends one `NotificationEvent` per new feed item
//! 3. `DeliveryWorker` receives every event and delivers it on its own task
//!
//! Events are self-contained: they carry every field the formatter needs.

pub mod channels;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, NotificationEventReceiver, NotificationEventSender,
    notification_event_channel,
};
