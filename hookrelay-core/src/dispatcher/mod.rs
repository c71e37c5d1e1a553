//! Delivery dispatcher.
//!
//! Fans one [`RenderedMessage`] out to every configured channel
//! concurrently. Each channel is its own failure domain: a transport error
//! or timeout on one channel is recorded in that channel's
//! [`ChannelReport`] and never affects the others. `dispatch` itself never
//! fails.
//!
//! Channels that cap message length receive the text split into chunks
//! (see [`split_message`]); chunks are sent in order and a failed chunk
//! does not stop the ones after it.

pub mod channels;

use crate::formatter::RenderedMessage;
use async_trait::async_trait;
use futures_util::future::join_all;
use hookrelay_sdk::config::ChannelsConfig;
use kanau::processor::Processor;
use std::convert::Infallible;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub use channels::{EmailChannel, NapcatChannel, TelegramChannel};

/// Errors raised by a single transport call.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("endpoint rejected the message: {0}")]
    Rejected(String),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("invalid email: {0}")]
    Email(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("channel misconfigured: {0}")]
    Misconfigured(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// One transport call's worth of content.
#[derive(Debug, Clone, Copy)]
pub struct OutboundMessage<'a> {
    pub subject: &'a str,
    pub text: &'a str,
    /// 1-based index of this chunk.
    pub part: usize,
    pub parts: usize,
}

/// A delivery channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Longest text, in characters, one `send` accepts. `None` for no limit.
    fn max_message_len(&self) -> Option<usize>;

    async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError>;
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunk {
    pub text: String,
    /// The boundary after this chunk consumed one `\n`.
    pub ends_line: bool,
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Boundaries prefer the last newline within reach, which is consumed;
/// a line longer than `limit` is hard-split. Appending `"\n"` after every
/// chunk with `ends_line` and concatenating gives back `text`.
pub fn split_message(text: &str, limit: usize) -> Vec<MessageChunk> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if limit == 0 || rest.chars().count() <= limit {
            chunks.push(MessageChunk {
                text: rest.to_owned(),
                ends_line: false,
            });
            break;
        }

        // Byte offset of the first character past the limit.
        let cut = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(i, _)| i);
        let reach = cut + rest[cut..].chars().next().map_or(0, char::len_utf8);

        match rest[..reach].rfind('\n') {
            Some(newline) => {
                chunks.push(MessageChunk {
                    text: rest[..newline].to_owned(),
                    ends_line: true,
                });
                rest = &rest[newline + 1..];
            }
            None => {
                chunks.push(MessageChunk {
                    text: rest[..cut].to_owned(),
                    ends_line: false,
                });
                rest = &rest[cut..];
            }
        }
    }

    chunks
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { chunks: usize },
    Partial { delivered: usize, failed: usize },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: String,
    pub outcome: DeliveryOutcome,
}

impl fmt::Display for ChannelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            DeliveryOutcome::Delivered { chunks } => {
                write!(f, "{}: delivered ({chunks} chunk(s))", self.channel)
            }
            DeliveryOutcome::Partial { delivered, failed } => write!(
                f,
                "{}: partial ({delivered} delivered, {failed} failed)",
                self.channel
            ),
            DeliveryOutcome::Failed { reason } => write!(f, "{}: failed: {reason}", self.channel),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
    send_timeout: Duration,
}

impl Dispatcher {
    /// A dispatcher without channels. Every transport call is bounded by
    /// `send_timeout`.
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            channels: Vec::new(),
            send_timeout,
        }
    }

    /// Register every channel present in `config`.
    pub fn from_config(
        config: &ChannelsConfig,
        client: reqwest::Client,
        send_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let mut dispatcher = Self::new(send_timeout);
        if let Some(telegram) = &config.telegram {
            dispatcher.push(TelegramChannel::new(telegram.clone(), client.clone()));
        }
        if let Some(email) = &config.email {
            dispatcher.push(EmailChannel::new(email.clone(), send_timeout)?);
        }
        if let Some(napcat) = &config.napcat {
            dispatcher.push(NapcatChannel::new(napcat.clone(), client));
        }
        Ok(dispatcher)
    }

    pub fn push(&mut self, channel: impl NotificationChannel + 'static) -> &mut Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn with_channel(mut self, channel: impl NotificationChannel + 'static) -> Self {
        self.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Deliver `message` on every channel; one report per channel, in
    /// registration order.
    pub async fn dispatch(&self, message: &RenderedMessage) -> Vec<ChannelReport> {
        join_all(
            self.channels
                .iter()
                .map(|channel| self.deliver(channel.as_ref(), message)),
        )
        .await
    }

    async fn deliver(
        &self,
        channel: &dyn NotificationChannel,
        message: &RenderedMessage,
    ) -> ChannelReport {
        let chunks: Vec<String> = match channel.max_message_len() {
            Some(limit) => split_message(&message.text, limit)
                .into_iter()
                .map(|c| c.text)
                .collect(),
            None => vec![message.text.clone()],
        };
        let chunks: Vec<String> = chunks
            .iter()
            .map(|c| c.trim_matches('\n'))
            .filter(|c| !c.trim().is_empty())
            .map(str::to_owned)
            .collect();

        let parts = chunks.len();
        let mut delivered = 0;
        let mut failures = Vec::new();

        for (index, text) in chunks.iter().enumerate() {
            let outbound = OutboundMessage {
                subject: &message.subject,
                text,
                part: index + 1,
                parts,
            };
            let result = match tokio::time::timeout(self.send_timeout, channel.send(&outbound)).await
            {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(self.send_timeout)),
            };
            match result {
                Ok(()) => {
                    delivered += 1;
                    debug!(channel = channel.name(), part = index + 1, parts, "Chunk delivered");
                }
                Err(e) => {
                    warn!(
                        channel = channel.name(),
                        part = index + 1,
                        parts,
                        error = %e,
                        "Chunk delivery failed"
                    );
                    failures.push(e.to_string());
                }
            }
        }

        let outcome = if failures.is_empty() {
            DeliveryOutcome::Delivered { chunks: delivered }
        } else if delivered == 0 {
            DeliveryOutcome::Failed {
                reason: failures.join("; "),
            }
        } else {
            DeliveryOutcome::Partial {
                delivered,
                failed: failures.len(),
            }
        };

        ChannelReport {
            channel: channel.name().to_owned(),
            outcome,
        }
    }
}

impl Processor<RenderedMessage> for Dispatcher {
    type Output = Vec<ChannelReport>;
    type Error = Infallible;

    async fn process(&self, message: RenderedMessage) -> Result<Vec<ChannelReport>, Infallible> {
        Ok(self.dispatch(&message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn rebuild(chunks: &[MessageChunk]) -> String {
        chunks
            .iter()
            .map(|c| {
                if c.ends_line {
                    format!("{}\n", c.text)
                } else {
                    c.text.clone()
                }
            })
            .collect()
    }

    #[test]
    fn test_split_short_text_is_one_chunk() {
        let chunks = split_message("hello\nworld", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello\nworld");
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn test_split_prefers_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 9);
        assert_eq!(chunks[0].text, "aaaa");
        assert!(chunks[0].ends_line);
        assert_eq!(rebuild(&chunks), text);
    }

    #[test]
    fn test_split_hard_splits_long_lines() {
        let text = "x".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| !c.ends_line));
        assert_eq!(rebuild(&chunks), text);
    }

    #[test]
    fn test_split_respects_limit_and_reconstructs() {
        let text = "first line\n\nsecond line that is rather long\nthird\u{00e9}\u{00e9}\u{00e9}\nend\n";
        for limit in 1..=text.chars().count() {
            let chunks = split_message(text, limit);
            assert!(chunks.iter().all(|c| c.text.chars().count() <= limit));
            assert_eq!(rebuild(&chunks), text, "limit {limit}");
        }
    }

    #[test]
    fn test_split_newline_exactly_at_limit() {
        let chunks = split_message("abc\ndef", 3);
        assert_eq!(chunks[0].text, "abc");
        assert!(chunks[0].ends_line);
        assert_eq!(chunks[1].text, "def");
    }

    struct Recording {
        name: &'static str,
        limit: Option<usize>,
        fail: bool,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotificationChannel for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn max_message_len(&self) -> Option<usize> {
            self.limit
        }

        async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
            if self.fail {
                return Err(ChannelError::Rejected("boom".into()));
            }
            self.sent.lock().unwrap().push(message.text.to_owned());
            Ok(())
        }
    }

    fn recording(name: &'static str, fail: bool) -> (Recording, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Recording {
                name,
                limit: None,
                fail,
                sent: sent.clone(),
            },
            sent,
        )
    }

    fn message(text: &str) -> RenderedMessage {
        RenderedMessage {
            text: text.into(),
            subject: "subject".into(),
        }
    }

    #[tokio::test]
    async fn test_one_failing_channel_does_not_affect_others() {
        let (a, sent_a) = recording("a", false);
        let (b, _) = recording("b", true);
        let (c, sent_c) = recording("c", false);
        let dispatcher = Dispatcher::new(Duration::from_secs(1))
            .with_channel(a)
            .with_channel(b)
            .with_channel(c);

        let reports = dispatcher.dispatch(&message("hello")).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].outcome, DeliveryOutcome::Delivered { chunks: 1 });
        assert!(matches!(reports[1].outcome, DeliveryOutcome::Failed { .. }));
        assert_eq!(reports[2].outcome, DeliveryOutcome::Delivered { chunks: 1 });
        assert_eq!(*sent_a.lock().unwrap(), vec!["hello".to_owned()]);
        assert_eq!(*sent_c.lock().unwrap(), vec!["hello".to_owned()]);
    }

    #[tokio::test]
    async fn test_chunks_sent_in_order_and_blank_chunks_skipped() {
        let (mut channel, sent) = recording("limited", false);
        channel.limit = Some(5);
        let dispatcher = Dispatcher::new(Duration::from_secs(1)).with_channel(channel);

        let reports = dispatcher.dispatch(&message("aaaa\n\n\nbbbb")).await;

        assert_eq!(reports[0].outcome, DeliveryOutcome::Delivered { chunks: 2 });
        assert_eq!(*sent.lock().unwrap(), vec!["aaaa".to_owned(), "bbbb".to_owned()]);
    }

    struct Stalled;

    #[async_trait]
    impl NotificationChannel for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn max_message_len(&self) -> Option<usize> {
            None
        }

        async fn send(&self, _message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_channel_times_out() {
        let (fast, sent) = recording("fast", false);
        let dispatcher = Dispatcher::new(Duration::from_secs(10))
            .with_channel(Stalled)
            .with_channel(fast);

        let reports = dispatcher.dispatch(&message("ping")).await;

        assert!(matches!(
            &reports[0].outcome,
            DeliveryOutcome::Failed { reason } if reason.contains("timed out")
        ));
        assert!(reports[1].outcome.is_delivered());
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_report_display() {
        let report = ChannelReport {
            channel: "telegram".into(),
            outcome: DeliveryOutcome::Partial {
                delivered: 2,
                failed: 1,
            },
        };
        assert_eq!(report.to_string(), "telegram: partial (2 delivered, 1 failed)");
    }
}
