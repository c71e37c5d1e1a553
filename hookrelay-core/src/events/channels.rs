//! Event channel factory and handles.

use hookrelay_sdk::objects::NotificationEvent;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for NotificationEvent events.
pub type NotificationEventSender = mpsc::Sender<NotificationEvent>;
/// Receiver handle for NotificationEvent events.
pub type NotificationEventReceiver = mpsc::Receiver<NotificationEvent>;

/// Create a new NotificationEvent channel.
///
/// Returns a (sender, receiver) pair. The webhook handlers and the feed
/// poller each hold a clone of the sender; the delivery worker owns the
/// receiver.
pub fn notification_event_channel() -> (NotificationEventSender, NotificationEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
