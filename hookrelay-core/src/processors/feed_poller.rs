//! FeedPoller processor.
//!
//! The FeedPoller is responsible for:
//! - Fetching every configured feed once per cycle, one after another
//! - Emitting a `NotificationEvent` for each item not seen before
//! - Persisting the seen-item store after each cycle and on shutdown
//! - Shortening the next sleep when a feed failed
//!
//! It owns the [`SeenItemStore`] outright. An item's identity is recorded
//! before its event is sent, so an item is announced at most once even if
//! delivery later fails.

use crate::events::NotificationEventSender;
use crate::feed::{FeedFetcher, SeenItemStore};
use hookrelay_sdk::config::{FeedConfig, RssConfig};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where a feed is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Fetching,
    Diffing,
}

/// Outcome of one pass over all feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feeds_checked: usize,
    pub failed_feeds: usize,
    pub new_items: usize,
}

impl CycleReport {
    pub fn had_failures(&self) -> bool {
        self.failed_feeds > 0
    }
}

pub struct FeedPoller {
    config: RssConfig,
    fetcher: Box<dyn FeedFetcher>,
    store: SeenItemStore,
    events_tx: NotificationEventSender,
}

impl FeedPoller {
    pub fn new(
        config: RssConfig,
        fetcher: impl FeedFetcher + 'static,
        store: SeenItemStore,
        events_tx: NotificationEventSender,
    ) -> Self {
        Self {
            config,
            fetcher: Box::new(fetcher),
            store,
            events_tx,
        }
    }

    pub fn store(&self) -> &SeenItemStore {
        &self.store
    }

    /// Poll until shutdown is signaled. The first cycle starts immediately.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            feeds = self.config.feeds.len(),
            interval_secs = self.config.check_interval.as_secs(),
            "FeedPoller started"
        );

        loop {
            let report = self.poll_cycle().await;
            self.persist().await;

            let delay = self.config.next_delay(report.had_failures());
            debug!(
                phase = ?PollPhase::Idle,
                delay_secs = delay.as_secs(),
                "Waiting for next poll cycle"
            );

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("FeedPoller received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.persist().await;
        info!("FeedPoller shutdown complete");
    }

    /// Check every feed once. A failing feed never stops the others.
    pub async fn poll_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let feeds = self.config.feeds.clone();

        for feed in &feeds {
            report.feeds_checked += 1;
            match self.poll_feed(feed).await {
                Ok(new_items) => report.new_items += new_items,
                Err(e) => {
                    warn!(feed = %feed.name, url = %feed.url, error = %e, "Feed check failed");
                    report.failed_feeds += 1;
                }
            }
        }

        info!(
            feeds = report.feeds_checked,
            failed = report.failed_feeds,
            new_items = report.new_items,
            "Poll cycle finished"
        );
        report
    }

    async fn poll_feed(&mut self, feed: &FeedConfig) -> Result<usize, crate::feed::FeedError> {
        debug!(feed = %feed.name, phase = ?PollPhase::Fetching, "Fetching feed");
        let document = self.fetcher.fetch(feed).await?;

        debug!(
            feed = %feed.name,
            phase = ?PollPhase::Diffing,
            items = document.items.len(),
            "Diffing feed items"
        );
        let mut new_items = 0;
        for item in &document.items {
            if !self.store.insert(item.identity()) {
                continue;
            }
            new_items += 1;
            if self.events_tx.send(item.to_event(&feed.name)).await.is_err() {
                warn!(feed = %feed.name, "Event channel closed, dropping feed item");
            }
        }

        if new_items > 0 {
            info!(feed = %feed.name, new_items, "New feed items");
        }
        Ok(new_items)
    }

    /// Save the store. On failure the in-memory set stays authoritative.
    async fn persist(&self) {
        if let Err(e) = self.store.save().await {
            error!(path = %self.store.path().display(), error = %e, "Failed to persist seen-item store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::notification_event_channel;
    use crate::feed::{FeedDocument, FeedError, FeedItem};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Serves canned documents per feed name; unknown names fail.
    #[derive(Clone, Default)]
    struct StaticFetcher {
        documents: Arc<Mutex<HashMap<String, FeedDocument>>>,
        calls: Arc<Mutex<usize>>,
    }

    impl StaticFetcher {
        fn serve(&self, name: &str, guids: &[&str]) {
            let items = guids
                .iter()
                .map(|g| FeedItem {
                    guid: Some((*g).to_owned()),
                    title: Some(format!("Post {g}")),
                    ..Default::default()
                })
                .collect();
            self.documents.lock().unwrap().insert(
                name.to_owned(),
                FeedDocument { title: None, items },
            );
        }
    }

    #[async_trait]
    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, feed: &FeedConfig) -> Result<FeedDocument, FeedError> {
            *self.calls.lock().unwrap() += 1;
            self.documents
                .lock()
                .unwrap()
                .get(&feed.name)
                .cloned()
                .ok_or(FeedError::Status(500))
        }
    }

    fn feed(name: &str) -> FeedConfig {
        FeedConfig {
            name: name.into(),
            url: format!("https://{name}.example/feed.xml").parse().unwrap(),
        }
    }

    fn config(dir: &tempfile::TempDir, feeds: Vec<FeedConfig>) -> RssConfig {
        RssConfig {
            feeds,
            state_file: dir.path().join("seen.json"),
            ..RssConfig::default()
        }
    }

    #[tokio::test]
    async fn test_failing_feed_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::default();
        fetcher.serve("good", &["1", "2"]);
        let (tx, mut rx) = notification_event_channel();
        let config = config(&dir, vec![feed("broken"), feed("good")]);
        let store = SeenItemStore::empty(&config.state_file);
        let mut poller = FeedPoller::new(config, fetcher, store, tx);

        let report = poller.poll_cycle().await;

        assert_eq!(report.failed_feeds, 1);
        assert_eq!(report.new_items, 2);
        assert!(report.had_failures());
        assert_eq!(rx.recv().await.unwrap().text("feed_name"), Some("good"));
    }

    #[tokio::test]
    async fn test_duplicates_within_document_emit_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::default();
        fetcher.serve("blog", &["a", "a", "b"]);
        let (tx, _rx) = notification_event_channel();
        let config = config(&dir, vec![feed("blog")]);
        let store = SeenItemStore::empty(&config.state_file);
        let mut poller = FeedPoller::new(config, fetcher, store, tx);

        assert_eq!(poller.poll_cycle().await.new_items, 2);
        assert_eq!(poller.store().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_channel_still_records_items() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::default();
        fetcher.serve("blog", &["a"]);
        let (tx, rx) = notification_event_channel();
        drop(rx);
        let config = config(&dir, vec![feed("blog")]);
        let store = SeenItemStore::empty(&config.state_file);
        let mut poller = FeedPoller::new(config, fetcher, store, tx);

        poller.poll_cycle().await;
        assert_eq!(poller.store().len(), 1);
        assert_eq!(poller.poll_cycle().await.new_items, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_persists_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::default();
        fetcher.serve("blog", &["a", "b"]);
        let calls = fetcher.calls.clone();
        let (tx, _rx) = notification_event_channel();
        let config = config(&dir, vec![feed("blog")]);
        let state_file = config.state_file.clone();
        let store = SeenItemStore::empty(&state_file);
        let poller = FeedPoller::new(config, fetcher, store, tx);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(shutdown_rx));

        // Two full intervals: the initial cycle plus two more.
        tokio::time::sleep(Duration::from_secs(2 * 30 * 60 + 1)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 3);
        let reloaded = SeenItemStore::load(&state_file).await;
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shortens_next_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::default();
        let calls = fetcher.calls.clone();
        let (tx, _rx) = notification_event_channel();
        let config = config(&dir, vec![feed("missing")]);
        let store = SeenItemStore::empty(&config.state_file);
        let poller = FeedPoller::new(config, fetcher, store, tx);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(shutdown_rx));

        // Backoff is 60 s, so five minutes allow several retries.
        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(*calls.lock().unwrap() >= 5);
    }
}
