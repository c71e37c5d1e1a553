//! Telegram Bot API channel.

use super::{check_status, endpoint};
use crate::dispatcher::{ChannelError, NotificationChannel, OutboundMessage};
use async_trait::async_trait;
use hookrelay_sdk::config::TelegramConfig;
use serde::{Deserialize, Serialize};

/// Telegram rejects texts over 4096 characters; stay below that.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    url: String,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, client: reqwest::Client) -> Self {
        let url = endpoint(
            &config.api_base,
            &format!("bot{}/sendMessage", config.bot_token),
        );
        Self {
            config,
            client,
            url,
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn max_message_len(&self) -> Option<usize> {
        Some(TELEGRAM_MESSAGE_LIMIT)
    }

    async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text: message.text,
            parse_mode: self.config.parse_mode.as_deref(),
        };
        let response = self.client.post(&self.url).json(&body).send().await?;
        let response = check_status(response).await?;

        let reply: ApiResponse = response.json().await?;
        if !reply.ok {
            return Err(ChannelError::Rejected(
                reply.description.unwrap_or_else(|| "ok=false".to_owned()),
            ));
        }
        Ok(())
    }
}
