//! Pull-based sources: fetching feed documents and remembering which items
//! were already announced.

pub mod parser;
pub mod store;

pub use parser::{FeedParseError, parse_feed};
pub use store::{SeenItemStore, StoreError};

use crate::normalizer::rss::ARTICLE_KIND;
use crate::utils::json::parse_timestamp;
use crate::utils::text::excerpt;
use async_trait::async_trait;
use hookrelay_sdk::config::FeedConfig;
use hookrelay_sdk::objects::{Fields, NotificationEvent, SourcePlatform};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// One entry of a feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
}

impl FeedItem {
    /// Guid, else permalink, else title followed by publish date.
    pub fn natural_key(&self) -> String {
        match (&self.guid, &self.link) {
            (Some(guid), _) => guid.clone(),
            (None, Some(link)) => link.clone(),
            (None, None) => format!(
                "{}{}",
                self.title.as_deref().unwrap_or_default(),
                self.published.as_deref().unwrap_or_default()
            ),
        }
    }

    /// Opaque dedup identity: lowercase hex SHA-256 of the natural key.
    pub fn identity(&self) -> String {
        let digest = ring::digest::digest(&ring::digest::SHA256, self.natural_key().as_bytes());
        hex::encode(digest.as_ref())
    }

    /// The canonical event announcing this item.
    pub fn to_event(&self, feed_name: &str) -> NotificationEvent {
        let mut fields = Fields::new();
        fields.insert("feed_name", feed_name);
        fields.insert_opt("title", self.title.as_deref());
        fields.insert_opt("url", self.link.as_deref());
        fields.insert_opt("author", self.author.as_deref());
        fields.insert_opt("published", self.published.as_deref());
        fields.insert_opt("description", self.description.as_deref().map(excerpt));

        NotificationEvent::new(SourcePlatform::Rss, ARTICLE_KIND)
            .with_fields(fields)
            .with_occurred_at(self.published.as_deref().and_then(parse_timestamp))
    }
}

/// A parsed feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

/// Errors that make a feed fail for one cycle.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed responded with status {0}")]
    Status(u16),
}

/// Fetches feed documents.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, feed: &FeedConfig) -> Result<FeedDocument, FeedError>;
}

/// Fetches feeds over HTTP with the shared client.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, feed: &FeedConfig) -> Result<FeedDocument, FeedError> {
        let response = self
            .client
            .get(feed.url.clone())
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
            )
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = response.text().await?;

        // A document that does not parse is not a fetch failure.
        match parse_feed(&body) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(feed = %feed.name, url = %feed.url, error = %e, "Malformed feed document");
                Ok(FeedDocument::default())
            }
        }
    }
}
