//! TOML file configuration structures.
//!
//! These structs directly map to the `hookrelay.toml` file format. Every
//! section has defaults, so a file containing only `[server]` is valid.
//! Secret-bearing sections deliberately do not derive `Debug`.

use hookrelay_sdk::config::{RssConfig, SendMode};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub global: GlobalConfig,
    pub secrets: SecretsConfig,
    pub telegram: TelegramConfig,
    pub email: EmailConfig,
    pub napcat: NapcatConfig,
    pub rss: RssSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Wait before delivering each event.
    pub notification_delay_seconds: u64,
    /// Upper bound for every outbound call.
    pub send_timeout_seconds: u64,
    pub proxy: ProxySection,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            notification_delay_seconds: 0,
            send_timeout_seconds: 10,
            proxy: ProxySection::default(),
        }
    }
}

/// `enabled = true` with an empty `url` means "use the system proxy".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    pub enabled: bool,
    pub url: String,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub github: String,
    pub gitlab: String,
    pub gitea: String,
    pub gogs: String,
    pub netlify: String,
    pub generic: String,
    pub rss: String,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    #[serde(deserialize_with = "id_string")]
    pub chat_id: String,
    pub parse_mode: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub sender_email: String,
    pub recipient_emails: RecipientList,
    /// Implicit TLS; takes precedence over `use_tls`.
    pub use_ssl: bool,
    /// STARTTLS.
    pub use_tls: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            sender_email: String::new(),
            recipient_emails: RecipientList::default(),
            use_ssl: false,
            use_tls: true,
        }
    }
}

/// Either a TOML array or a single comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipientList {
    List(Vec<String>),
    Joined(String),
}

impl Default for RecipientList {
    fn default() -> Self {
        RecipientList::List(Vec::new())
    }
}

impl RecipientList {
    pub fn addresses(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            RecipientList::List(list) => list.iter().map(String::as_str).collect(),
            RecipientList::Joined(joined) => joined.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct NapcatConfig {
    pub enabled: bool,
    pub base_url: String,
    pub send_mode: SendMode,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
    #[serde(deserialize_with = "id_string")]
    pub group_id: String,
    pub access_token: String,
}

impl Default for NapcatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:3000".to_owned(),
            send_mode: SendMode::default(),
            user_id: String::new(),
            group_id: String::new(),
            access_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RssSection {
    pub enabled: bool,
    pub check_interval_minutes: u64,
    /// Retry delay after a failed cycle, capped at the check interval.
    pub error_backoff_seconds: u64,
    pub state_file: PathBuf,
    pub feeds: Vec<FeedEntry>,
}

impl Default for RssSection {
    fn default() -> Self {
        Self {
            enabled: false,
            check_interval_minutes: RssConfig::DEFAULT_CHECK_INTERVAL.as_secs() / 60,
            error_backoff_seconds: RssConfig::DEFAULT_ERROR_BACKOFF.as_secs(),
            state_file: PathBuf::from(RssConfig::DEFAULT_STATE_FILE),
            feeds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Chat and group ids are often written as bare integers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Int(n) => n.to_string(),
        Id::Text(s) => s,
    })
}
