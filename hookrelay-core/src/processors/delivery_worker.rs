//! DeliveryWorker processor.
//!
//! The DeliveryWorker is responsible for:
//! - Receiving `NotificationEvent` from the event channel
//! - Spawning one independent delivery task per event
//! - Waiting the configured notification delay, formatting the event and
//!   dispatching it to every channel
//! - Logging the per-channel reports
//!
//! Delivery tasks are fire-and-forget: shutdown stops intake but does not
//! wait for tasks already in flight.

use crate::dispatcher::{ChannelReport, Dispatcher};
use crate::events::NotificationEventReceiver;
use crate::formatter::MessageFormatter;
use hookrelay_sdk::objects::NotificationEvent;
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct DeliveryWorker {
    formatter: Arc<MessageFormatter>,
    dispatcher: Arc<Dispatcher>,
    delay: Duration,
}

impl DeliveryWorker {
    pub fn new(formatter: MessageFormatter, dispatcher: Dispatcher, delay: Duration) -> Self {
        Self {
            formatter: Arc::new(formatter),
            dispatcher: Arc::new(dispatcher),
            delay,
        }
    }

    /// Run the DeliveryWorker until shutdown or until every sender is gone.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut events_rx: NotificationEventReceiver,
    ) {
        if self.dispatcher.is_empty() {
            warn!("No delivery channels configured, events will only be logged");
        }
        info!(
            channels = ?self.dispatcher.channel_names(),
            delay_secs = self.delay.as_secs(),
            "DeliveryWorker started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("DeliveryWorker received shutdown signal");
                        break;
                    }
                }

                Some(event) = events_rx.recv() => {
                    debug!(
                        platform = %event.source_platform,
                        kind = %event.event_kind,
                        "Received NotificationEvent"
                    );
                    self.spawn_delivery(event);
                }

                else => {
                    info!("NotificationEvent channel closed");
                    break;
                }
            }
        }

        info!("DeliveryWorker shutdown complete");
    }

    /// Deliver `event` on its own task.
    pub fn spawn_delivery(&self, event: NotificationEvent) -> JoinHandle<Vec<ChannelReport>> {
        let worker = self.clone();
        tokio::spawn(async move { worker.deliver(event).await })
    }

    /// Wait the delay, format, dispatch and log the reports.
    pub async fn deliver(&self, event: NotificationEvent) -> Vec<ChannelReport> {
        let job_id = Uuid::new_v4();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let message = self.formatter.format(&event);
        info!(
            job_id = %job_id,
            platform = %event.source_platform,
            kind = %event.event_kind,
            subject = %message.subject,
            "Delivering notification"
        );

        let reports = self.dispatcher.dispatch(&message).await;
        for report in &reports {
            if report.outcome.is_delivered() {
                info!(job_id = %job_id, report = %report, "Channel delivery finished");
            } else {
                warn!(job_id = %job_id, report = %report, "Channel delivery incomplete");
            }
        }
        reports
    }
}

impl Processor<NotificationEvent> for DeliveryWorker {
    type Output = Vec<ChannelReport>;
    type Error = Infallible;

    async fn process(&self, event: NotificationEvent) -> Result<Vec<ChannelReport>, Infallible> {
        Ok(self.deliver(event).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{ChannelError, NotificationChannel, OutboundMessage};
    use crate::events::notification_event_channel;
    use async_trait::async_trait;
    use hookrelay_sdk::objects::SourcePlatform;
    use tokio::sync::mpsc;

    struct Forwarding(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl NotificationChannel for Forwarding {
        fn name(&self) -> &str {
            "forwarding"
        }

        fn max_message_len(&self) -> Option<usize> {
            None
        }

        async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
            let _ = self.0.send(message.subject.to_owned());
            Ok(())
        }
    }

    fn worker(delay: Duration) -> (DeliveryWorker, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(Duration::from_secs(5)).with_channel(Forwarding(tx));
        (
            DeliveryWorker::new(MessageFormatter::default(), dispatcher, delay),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_before_dispatch() {
        let (worker, mut delivered) = worker(Duration::from_secs(30));
        let event = NotificationEvent::new(SourcePlatform::Generic, "build");

        let started = tokio::time::Instant::now();
        let reports = worker.spawn_delivery(event).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(reports.len(), 1);
        assert_eq!(
            delivered.recv().await.as_deref(),
            Some("New Generic webhook notification")
        );
    }

    #[tokio::test]
    async fn test_run_delivers_until_channel_closes() {
        let (worker, mut delivered) = worker(Duration::ZERO);
        let (events_tx, events_rx) = notification_event_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx, events_rx));

        events_tx
            .send(
                NotificationEvent::new(SourcePlatform::GitHub, "push")
                    .with_field("repository", "acme/widgets"),
            )
            .await
            .unwrap();
        assert_eq!(
            delivered.recv().await.as_deref(),
            Some("[GitHub] acme/widgets: push")
        );

        drop(events_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_processor_returns_reports() {
        let (worker, _delivered) = worker(Duration::ZERO);
        let reports = worker
            .process(NotificationEvent::new(SourcePlatform::Netlify, "deploy"))
            .await
            .unwrap();
        assert!(reports[0].outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (worker, _delivered) = worker(Duration::ZERO);
        let (_events_tx, events_rx) = notification_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx, events_rx));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_are_delivered_independently() {
        let (worker, mut delivered) = worker(Duration::ZERO);
        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|kind| worker.spawn_delivery(NotificationEvent::new(SourcePlatform::Generic, kind)))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let mut count = 0;
        while delivered.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
