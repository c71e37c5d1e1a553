//! Outbound channel configuration.
//!
//! A channel is present in [`ChannelsConfig`] only when it is enabled and
//! complete; the server crate logs and drops incomplete sections.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Public Telegram Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// `HTML`, `Markdown` or `MarkdownV2`; plain text when `None`.
    pub parse_mode: Option<String>,
    /// Overridable for self-hosted Bot API servers.
    pub api_base: Url,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("parse_mode", &self.parse_mode)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// Transport security for SMTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS from the first byte (usually port 465).
    ImplicitTls,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    StartTls,
    /// No encryption. Only for local relays.
    Plain,
}

impl SmtpSecurity {
    /// Resolve the `use_ssl` / `use_tls` pair of the config file.
    ///
    /// `use_ssl` wins when both are set.
    pub fn from_flags(use_ssl: bool, use_tls: bool) -> Self {
        match (use_ssl, use_tls) {
            (true, _) => SmtpSecurity::ImplicitTls,
            (false, true) => SmtpSecurity::StartTls,
            (false, false) => SmtpSecurity::Plain,
        }
    }
}

/// SMTP email channel.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub security: SmtpSecurity,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .field("security", &self.security)
            .finish()
    }
}

/// Which Napcat targets receive a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    #[serde(alias = "private")]
    Individual,
    Group,
    #[default]
    #[serde(alias = "all")]
    Both,
}

impl SendMode {
    pub fn includes_individual(self) -> bool {
        matches!(self, SendMode::Individual | SendMode::Both)
    }

    pub fn includes_group(self) -> bool {
        matches!(self, SendMode::Group | SendMode::Both)
    }
}

/// Napcat (OneBot 11 HTTP API) channel.
#[derive(Clone, PartialEq, Eq)]
pub struct NapcatConfig {
    pub base_url: Url,
    pub send_mode: SendMode,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    /// Sent as a bearer token when set.
    pub access_token: Option<String>,
}

impl fmt::Debug for NapcatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NapcatConfig")
            .field("base_url", &self.base_url.as_str())
            .field("send_mode", &self.send_mode)
            .field("user_id", &self.user_id)
            .field("group_id", &self.group_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// All enabled channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelsConfig {
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
    pub napcat: Option<NapcatConfig>,
}

impl ChannelsConfig {
    pub fn enabled_count(&self) -> usize {
        usize::from(self.telegram.is_some())
            + usize::from(self.email.is_some())
            + usize::from(self.napcat.is_some())
    }
}
