//! Napcat channel (OneBot 11 HTTP API).
//!
//! Depending on the send mode a message goes to a private chat, a group,
//! or both. A mode whose target id is missing is logged once at
//! construction and that leg is skipped.

use super::{check_status, endpoint};
use crate::dispatcher::{ChannelError, NotificationChannel, OutboundMessage};
use async_trait::async_trait;
use hookrelay_sdk::config::NapcatConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Private,
    Group,
}

impl Leg {
    fn action(self) -> &'static str {
        match self {
            Leg::Private => "send_private_msg",
            Leg::Group => "send_group_msg",
        }
    }

    fn id_key(self) -> &'static str {
        match self {
            Leg::Private => "user_id",
            Leg::Group => "group_id",
        }
    }
}

#[derive(Deserialize)]
struct ActionResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    retcode: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

pub struct NapcatChannel {
    config: NapcatConfig,
    client: reqwest::Client,
    targets: Vec<(Leg, Value)>,
}

/// Numeric ids go out as numbers; anything else as given.
fn target_id(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

impl NapcatChannel {
    pub fn new(config: NapcatConfig, client: reqwest::Client) -> Self {
        let mut targets = Vec::new();
        let mode = config.send_mode;

        if mode.includes_individual() {
            match config.user_id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => targets.push((Leg::Private, target_id(id))),
                None => error!(send_mode = ?mode, "Napcat user_id not configured, skipping private messages"),
            }
        }
        if mode.includes_group() {
            match config.group_id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => targets.push((Leg::Group, target_id(id))),
                None => error!(send_mode = ?mode, "Napcat group_id not configured, skipping group messages"),
            }
        }

        Self {
            config,
            client,
            targets,
        }
    }

    async fn send_leg(&self, leg: Leg, id: &Value, text: &str) -> Result<(), ChannelError> {
        let mut body = serde_json::Map::new();
        body.insert(leg.id_key().to_owned(), id.clone());
        body.insert("message".to_owned(), json!(text));

        let mut request = self
            .client
            .post(endpoint(&self.config.base_url, leg.action()))
            .json(&body);
        if let Some(token) = self.config.access_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = check_status(request.send().await?).await?;
        let reply: ActionResponse = response.json().await?;
        let failed = reply.status.as_deref() == Some("failed")
            || reply.retcode.is_some_and(|code| code != 0);
        if failed {
            return Err(ChannelError::Rejected(
                reply
                    .message
                    .unwrap_or_else(|| format!("{} failed", leg.action())),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for NapcatChannel {
    fn name(&self) -> &str {
        "napcat"
    }

    fn max_message_len(&self) -> Option<usize> {
        None
    }

    async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
        if self.targets.is_empty() {
            return Err(ChannelError::Misconfigured(
                "no user_id or group_id for the configured send mode".to_owned(),
            ));
        }

        // Every leg runs even when an earlier one failed.
        let mut failures = Vec::new();
        for (leg, id) in &self.targets {
            if let Err(e) = self.send_leg(*leg, id, message.text).await {
                warn!(action = leg.action(), error = %e, "Napcat send failed");
                failures.push(format!("{}: {e}", leg.action()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::Rejected(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::config::SendMode;
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, mode: SendMode) -> NapcatConfig {
        NapcatConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            send_mode: mode,
            user_id: Some("10001".into()),
            group_id: Some("20002".into()),
            access_token: None,
        }
    }

    fn outbound(text: &str) -> OutboundMessage<'_> {
        OutboundMessage {
            subject: "s",
            text,
            part: 1,
            parts: 1,
        }
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "retcode": 0}))
    }

    #[tokio::test]
    async fn test_both_mode_sends_private_and_group() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_private_msg"))
            .and(body_json(json!({"user_id": 10001, "message": "hi"})))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send_group_msg"))
            .and(body_json(json!({"group_id": 20002, "message": "hi"})))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let channel = NapcatChannel::new(config(&server, SendMode::Both), reqwest::Client::new());
        channel.send(&outbound("hi")).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_private_leg_still_sends_group() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_private_msg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send_group_msg"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let channel = NapcatChannel::new(config(&server, SendMode::Both), reqwest::Client::new());
        let err = channel.send(&outbound("hi")).await.unwrap_err();
        assert!(err.to_string().contains("send_private_msg"));
    }

    #[tokio::test]
    async fn test_missing_target_skips_leg() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_group_msg"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = config(&server, SendMode::Both);
        cfg.user_id = None;
        cfg.access_token = Some("secret".into());
        let channel = NapcatChannel::new(cfg, reqwest::Client::new());
        channel.send(&outbound("hi")).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_targets_is_misconfigured() {
        let server = MockServer::start().await;
        let mut cfg = config(&server, SendMode::Individual);
        cfg.user_id = Some(String::new());
        let channel = NapcatChannel::new(cfg, reqwest::Client::new());
        let err = channel.send(&outbound("hi")).await.unwrap_err();
        assert!(matches!(err, ChannelError::Misconfigured(_)));
    }

    #[tokio::test]
    async fn test_failed_status_in_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "failed", "retcode": 100, "message": "no such group"})),
            )
            .mount(&server)
            .await;

        let channel = NapcatChannel::new(config(&server, SendMode::Group), reqwest::Client::new());
        let err = channel.send(&outbound("hi")).await.unwrap_err();
        assert!(err.to_string().contains("no such group"));
    }
}
