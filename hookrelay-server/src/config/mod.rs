//! Configuration module for hookrelay-server.
//!
//! Loads the TOML file, applies CLI overrides, validates it and converts
//! it into the runtime types the core crate consumes.

pub mod file;

use crate::config::file::{
    EmailConfig as FileEmailConfig, FileConfig, GlobalConfig, NapcatConfig as FileNapcatConfig,
    RssSection, SecretsConfig, TelegramConfig as FileTelegramConfig,
};
use hookrelay_sdk::config::{
    ChannelsConfig, DEFAULT_TELEGRAM_API_BASE, DeliveryConfig, EmailConfig, FeedConfig,
    NapcatConfig, PlatformSecrets, ProxyConfig, RssConfig, SmtpSecurity, TelegramConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub secrets: PlatformSecrets,
    pub delivery: DeliveryConfig,
    pub channels: ChannelsConfig,
    /// `None` when polling is disabled or there is nothing to poll.
    pub rss: Option<RssConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate and convert every section
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        Self::from_toml(&config_content, self.listen_override)
    }

    pub fn from_toml(
        content: &str,
        listen_override: Option<SocketAddr>,
    ) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = listen_override {
            file_config.server.listen = listen;
        }

        let channels = ChannelsConfig {
            telegram: convert_telegram(file_config.telegram),
            email: convert_email(file_config.email),
            napcat: convert_napcat(file_config.napcat)?,
        };
        if channels.enabled_count() == 0 {
            tracing::warn!("No notification channel is enabled, events will only be logged");
        }

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            secrets: convert_secrets(file_config.secrets),
            delivery: convert_delivery(&file_config.global)?,
            channels,
            rss: convert_rss(file_config.rss)?,
        })
    }
}

fn convert_secrets(s: SecretsConfig) -> PlatformSecrets {
    PlatformSecrets {
        github: s.github,
        gitlab: s.gitlab,
        gitea: s.gitea,
        gogs: s.gogs,
        netlify: s.netlify,
        generic: s.generic,
        rss: s.rss,
    }
}

fn parse_url(what: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim())
        .map_err(|e| ConfigError::ValidationError(format!("invalid {what} `{raw}`: {e}")))
}

fn convert_delivery(global: &GlobalConfig) -> Result<DeliveryConfig, ConfigError> {
    if global.send_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "global.send_timeout_seconds must be greater than 0".to_owned(),
        ));
    }

    let proxy = match (global.proxy.enabled, global.proxy.url.trim()) {
        (false, _) => ProxyConfig::Direct,
        (true, "") => ProxyConfig::System,
        (true, url) => ProxyConfig::Explicit(parse_url("global.proxy.url", url)?),
    };

    Ok(DeliveryConfig {
        notification_delay: Duration::from_secs(global.notification_delay_seconds),
        send_timeout: Duration::from_secs(global.send_timeout_seconds),
        proxy,
    })
}

fn convert_telegram(t: FileTelegramConfig) -> Option<TelegramConfig> {
    if !t.enabled {
        return None;
    }
    if t.bot_token.trim().is_empty() || t.chat_id.trim().is_empty() {
        tracing::warn!("Telegram enabled but bot_token or chat_id is missing, channel disabled");
        return None;
    }

    let api_base = t.api_base.as_deref().unwrap_or(DEFAULT_TELEGRAM_API_BASE);
    let api_base = match Url::parse(api_base) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(api_base, error = %e, "Invalid Telegram api_base, channel disabled");
            return None;
        }
    };

    Some(TelegramConfig {
        bot_token: t.bot_token.trim().to_owned(),
        chat_id: t.chat_id.trim().to_owned(),
        parse_mode: t.parse_mode.filter(|m| !m.is_empty()),
        api_base,
    })
}

fn convert_email(e: FileEmailConfig) -> Option<EmailConfig> {
    if !e.enabled {
        return None;
    }
    let recipients = e.recipient_emails.addresses();
    if e.smtp_server.trim().is_empty() || e.sender_email.trim().is_empty() || recipients.is_empty()
    {
        tracing::warn!(
            "Email enabled but smtp_server, sender_email or recipient_emails is missing, channel disabled"
        );
        return None;
    }

    Some(EmailConfig {
        smtp_server: e.smtp_server.trim().to_owned(),
        smtp_port: e.smtp_port,
        username: e.smtp_username,
        password: e.smtp_password,
        sender: e.sender_email.trim().to_owned(),
        recipients,
        security: SmtpSecurity::from_flags(e.use_ssl, e.use_tls),
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn convert_napcat(n: FileNapcatConfig) -> Result<Option<NapcatConfig>, ConfigError> {
    if !n.enabled {
        return Ok(None);
    }
    Ok(Some(NapcatConfig {
        base_url: parse_url("napcat.base_url", &n.base_url)?,
        send_mode: n.send_mode,
        user_id: non_empty(n.user_id),
        group_id: non_empty(n.group_id),
        access_token: non_empty(n.access_token),
    }))
}

fn convert_rss(r: RssSection) -> Result<Option<RssConfig>, ConfigError> {
    if r.check_interval_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "rss.check_interval_minutes must be greater than 0".to_owned(),
        ));
    }
    if !r.enabled {
        return Ok(None);
    }

    let mut feeds = Vec::new();
    for entry in r.feeds.into_iter().filter(|f| f.enabled) {
        if entry.url.trim().is_empty() {
            tracing::warn!(feed = %entry.name, "Feed has no url, skipping");
            continue;
        }
        let url = parse_url(&format!("url for feed `{}`", entry.name), &entry.url)?;
        feeds.push(FeedConfig {
            name: entry.name,
            url,
        });
    }
    if feeds.is_empty() {
        tracing::info!("RSS enabled but no feeds are active");
        return Ok(None);
    }

    Ok(Some(RssConfig {
        feeds,
        check_interval: Duration::from_secs(r.check_interval_minutes * 60),
        error_backoff: Duration::from_secs(r.error_backoff_seconds),
        state_file: r.state_file,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::config::SendMode;

    fn load(toml: &str) -> Result<LoadedConfig, ConfigError> {
        ConfigLoader::from_toml(toml, None)
    }

    #[test]
    fn test_load_from_file_with_listen_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hookrelay.toml");
        std::fs::write(&path, "[server]\nlisten = \"127.0.0.1:9000\"\n").unwrap();

        let override_addr: SocketAddr = "127.0.0.1:9100".parse().unwrap();
        let loaded = ConfigLoader::new(&path, Some(override_addr)).load().unwrap();
        assert_eq!(loaded.server.listen, override_addr);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::new(dir.path().join("absent.toml"), None).load();
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_proxy_modes() {
        let direct = load("").unwrap();
        assert_eq!(direct.delivery.proxy, ProxyConfig::Direct);

        let system = load("[global.proxy]\nenabled = true\n").unwrap();
        assert_eq!(system.delivery.proxy, ProxyConfig::System);

        let explicit = load("[global.proxy]\nenabled = true\nurl = \"http://127.0.0.1:7890\"\n")
            .unwrap();
        assert!(matches!(explicit.delivery.proxy, ProxyConfig::Explicit(_)));

        let invalid = load("[global.proxy]\nenabled = true\nurl = \"not a url\"\n");
        assert!(matches!(invalid, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_check_interval_is_rejected() {
        let result = load("[rss]\ncheck_interval_minutes = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rss_feeds_filtered() {
        let loaded = load(
            r#"
[rss]
enabled = true
check_interval_minutes = 10

[[rss.feeds]]
name = "Blog"
url = "https://blog.example/feed.xml"

[[rss.feeds]]
name = "No URL"

[[rss.feeds]]
name = "Off"
url = "https://off.example/feed.xml"
enabled = false
"#,
        )
        .unwrap();
        let rss = loaded.rss.unwrap();
        assert_eq!(rss.feeds.len(), 1);
        assert_eq!(rss.feeds[0].name, "Blog");
        assert_eq!(rss.check_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_feed_url_is_rejected() {
        let result = load("[rss]\nenabled = true\n[[rss.feeds]]\nname = \"x\"\nurl = \"::\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rss_without_feeds_is_not_started() {
        assert!(load("[rss]\nenabled = true\n").unwrap().rss.is_none());
        assert!(load("").unwrap().rss.is_none());
    }

    #[test]
    fn test_incomplete_channels_are_not_registered() {
        let loaded = load(
            r#"
[telegram]
enabled = true
bot_token = "123:ABC"

[email]
enabled = true
smtp_server = "smtp.example.com"
sender_email = "relay@example.com"
"#,
        )
        .unwrap();
        assert!(loaded.channels.telegram.is_none());
        assert!(loaded.channels.email.is_none());
        assert_eq!(loaded.channels.enabled_count(), 0);
    }

    #[test]
    fn test_channels_converted() {
        let loaded = load(
            r#"
[telegram]
enabled = true
bot_token = "123:ABC"
chat_id = "42"

[email]
enabled = true
smtp_server = "smtp.example.com"
sender_email = "relay@example.com"
recipient_emails = ["ops@example.com"]
use_tls = false

[napcat]
enabled = true
send_mode = "group"
group_id = "20002"
access_token = ""
"#,
        )
        .unwrap();

        let telegram = loaded.channels.telegram.unwrap();
        assert_eq!(telegram.api_base.as_str(), "https://api.telegram.org/");
        let email = loaded.channels.email.unwrap();
        assert_eq!(email.security, SmtpSecurity::Plain);
        let napcat = loaded.channels.napcat.unwrap();
        assert_eq!(napcat.send_mode, SendMode::Group);
        assert_eq!(napcat.group_id.as_deref(), Some("20002"));
        assert!(napcat.user_id.is_none());
        assert!(napcat.access_token.is_none());
    }

    #[test]
    fn test_invalid_napcat_base_url_is_rejected() {
        let result = load("[napcat]\nenabled = true\nbase_url = \"nope\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
