//! RSS/Atom polling configuration.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// A single feed to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Display name shown in notifications.
    pub name: String,
    pub url: Url,
}

/// Settings for the feed poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssConfig {
    /// Enabled feeds only; disabled ones are dropped during config loading.
    pub feeds: Vec<FeedConfig>,
    /// Time between poll cycles.
    pub check_interval: Duration,
    /// Time before the next cycle when a feed failed in the current one.
    pub error_backoff: Duration,
    /// Where seen item identities are persisted.
    pub state_file: PathBuf,
}

impl RssConfig {
    pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);
    pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(60);
    pub const DEFAULT_STATE_FILE: &'static str = "rss_last_check.json";

    /// Delay before the next cycle given whether the last one had failures.
    pub fn next_delay(&self, had_failures: bool) -> Duration {
        if had_failures {
            self.error_backoff.min(self.check_interval)
        } else {
            self.check_interval
        }
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            check_interval: Self::DEFAULT_CHECK_INTERVAL,
            error_backoff: Self::DEFAULT_ERROR_BACKOFF,
            state_file: PathBuf::from(Self::DEFAULT_STATE_FILE),
        }
    }
}
