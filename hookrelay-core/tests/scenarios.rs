//! End-to-end paths through normalizer, feed poller, formatter and
//! dispatcher.

use async_trait::async_trait;
use hookrelay_core::dispatcher::{
    ChannelError, DeliveryOutcome, Dispatcher, NapcatChannel, NotificationChannel,
    OutboundMessage, TelegramChannel,
};
use hookrelay_core::events::notification_event_channel;
use hookrelay_core::feed::{FeedItem, HttpFeedFetcher, SeenItemStore};
use hookrelay_core::formatter::MessageFormatter;
use hookrelay_core::ingest::{InboundWebhook, PlatformHint, WebhookHeaders};
use hookrelay_core::normalizer::{Normalized, Normalizer};
use hookrelay_core::processors::FeedPoller;
use hookrelay_sdk::config::{
    FeedConfig, NapcatConfig, PlatformSecrets, RssConfig, SendMode, TelegramConfig,
};
use hookrelay_sdk::objects::SourcePlatform;
use hookrelay_sdk::signature::{SignatureScheme, sign};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn github_secrets() -> PlatformSecrets {
    PlatformSecrets {
        github: "s3cret".into(),
        ..PlatformSecrets::default()
    }
}

fn github_request(event: &str, body: &[u8]) -> InboundWebhook {
    let headers = WebhookHeaders::new()
        .with("X-GitHub-Event", event)
        .with("Content-Type", "application/json")
        .with(
            "X-Hub-Signature-256",
            sign(body, "s3cret", SignatureScheme::HmacSha256Prefixed),
        );
    InboundWebhook::new(PlatformHint::DetectGitHost, headers, body.to_vec())
}

#[test]
fn push_without_commits_is_no_event() {
    let body = serde_json::to_vec(&json!({
        "ref": "refs/heads/main",
        "repository": {"full_name": "acme/widgets"},
        "commits": []
    }))
    .unwrap();

    let normalized = Normalizer::new(github_secrets())
        .normalize(&github_request("push", &body))
        .unwrap();

    assert!(matches!(
        normalized,
        Normalized::NoEvent {
            platform: SourcePlatform::GitHub,
            ..
        }
    ));
}

#[test]
fn release_with_two_assets_lists_both_in_order() {
    let body = serde_json::to_vec(&json!({
        "action": "published",
        "repository": {"full_name": "acme/widgets"},
        "release": {
            "tag_name": "v1.2.0",
            "name": "Widgets 1.2",
            "html_url": "https://github.com/acme/widgets/releases/v1.2.0",
            "author": {"login": "ada"},
            "assets": [
                {"name": "widgets-linux.tar.gz", "browser_download_url": "https://dl.example/linux"},
                {"name": "widgets-macos.zip", "browser_download_url": "https://dl.example/macos"}
            ]
        }
    }))
    .unwrap();

    let Normalized::Event(event) = Normalizer::new(github_secrets())
        .normalize(&github_request("release", &body))
        .unwrap()
    else {
        panic!("expected an event");
    };
    let message = MessageFormatter::default().format(&event);

    let linux = message
        .text
        .find("widgets-linux.tar.gz: https://dl.example/linux")
        .unwrap();
    let macos = message
        .text
        .find("widgets-macos.zip: https://dl.example/macos")
        .unwrap();
    assert!(linux < macos);
    assert_eq!(message.subject, "[GitHub] acme/widgets: release");
}

fn rss_document(guids: &[&str]) -> String {
    let items: String = guids
        .iter()
        .map(|g| {
            format!(
                "<item><guid>{g}</guid><title>Post {g}</title><link>https://blog.example/{g}</link></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Blog</title>{items}</channel></rss>"
    )
}

fn identity(guid: &str) -> String {
    FeedItem {
        guid: Some(guid.to_owned()),
        ..FeedItem::default()
    }
    .identity()
}

async fn serve_feed(guids: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_document(guids)))
        .mount(&server)
        .await;
    server
}

fn rss_config(server: &MockServer, dir: &tempfile::TempDir) -> RssConfig {
    RssConfig {
        feeds: vec![FeedConfig {
            name: "Blog".into(),
            url: format!("{}/feed.xml", server.uri()).parse().unwrap(),
        }],
        state_file: dir.path().join("rss_last_check.json"),
        ..RssConfig::default()
    }
}

fn fetcher() -> HttpFeedFetcher {
    HttpFeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5))
}

#[tokio::test]
async fn five_items_with_two_seen_emit_three_events() {
    let guids = ["p1", "p2", "p3", "p4", "p5"];
    let server = serve_feed(&guids).await;
    let dir = tempfile::tempdir().unwrap();
    let config = rss_config(&server, &dir);

    let mut store = SeenItemStore::empty(&config.state_file);
    store.insert(identity("p2"));
    store.insert(identity("p4"));

    let (tx, mut rx) = notification_event_channel();
    let mut poller = FeedPoller::new(config, fetcher(), store, tx);
    let report = poller.poll_cycle().await;

    assert_eq!(report.new_items, 3);
    let mut titles = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.event_kind, "article");
        titles.push(event.text("title").unwrap_or_default().to_owned());
    }
    assert_eq!(titles, vec!["Post p1", "Post p3", "Post p5"]);
    assert_eq!(poller.store().len(), 5);
    for guid in guids {
        assert!(poller.store().contains(&identity(guid)));
    }
}

#[tokio::test]
async fn item_in_two_cycles_is_announced_and_persisted_once() {
    let server = serve_feed(&["only"]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = rss_config(&server, &dir);
    let state_file = config.state_file.clone();

    let (tx, mut rx) = notification_event_channel();
    let store = SeenItemStore::load(&state_file).await;
    let mut poller = FeedPoller::new(config, fetcher(), store, tx);

    assert_eq!(poller.poll_cycle().await.new_items, 1);
    assert_eq!(poller.poll_cycle().await.new_items, 0);
    poller.store().save().await.unwrap();

    let mut events = 0;
    while rx.try_recv().is_ok() {
        events += 1;
    }
    assert_eq!(events, 1);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&state_file).unwrap()).unwrap();
    let seen = raw["seen_articles"].as_array().unwrap();
    let expected = identity("only");
    assert_eq!(seen.iter().filter(|s| s.as_str() == Some(&expected)).count(), 1);
}

struct Capturing(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl NotificationChannel for Capturing {
    fn name(&self) -> &str {
        "capturing"
    }

    fn max_message_len(&self) -> Option<usize> {
        None
    }

    async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
        self.0.lock().unwrap().push(message.text.to_owned());
        Ok(())
    }
}

#[tokio::test]
async fn failing_channel_does_not_block_the_others() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botT/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let client = reqwest::Client::new();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new(Duration::from_secs(5))
        .with_channel(TelegramChannel::new(
            TelegramConfig {
                bot_token: "T".into(),
                chat_id: "1".into(),
                parse_mode: None,
                api_base: base.clone(),
            },
            client.clone(),
        ))
        .with_channel(NapcatChannel::new(
            NapcatConfig {
                base_url: base,
                send_mode: SendMode::Individual,
                user_id: Some("7".into()),
                group_id: None,
                access_token: None,
            },
            client,
        ))
        .with_channel(Capturing(captured.clone()));

    let event = hookrelay_sdk::objects::NotificationEvent::new(SourcePlatform::Generic, "build")
        .with_field("status", "ok");
    let reports = dispatcher
        .dispatch(&MessageFormatter::default().format(&event))
        .await;

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].channel, "telegram");
    assert!(reports[0].outcome.is_delivered());
    assert_eq!(reports[1].channel, "napcat");
    assert!(matches!(reports[1].outcome, DeliveryOutcome::Failed { .. }));
    assert!(reports[2].outcome.is_delivered());
    assert_eq!(captured.lock().unwrap().len(), 1);
}
