//! Configuration types for hookrelay.
//!
//! These types represent the validated runtime configuration shared by the
//! pipeline crates. Loading and parsing the TOML file is handled by the
//! server crate, which converts its file structs into these.

mod channels;
mod delivery;
mod feeds;
mod secrets;

pub use channels::{
    ChannelsConfig, EmailConfig, NapcatConfig, SendMode, SmtpSecurity, TelegramConfig,
    DEFAULT_TELEGRAM_API_BASE,
};
pub use delivery::{DeliveryConfig, ProxyConfig};
pub use feeds::{FeedConfig, RssConfig};
pub use secrets::PlatformSecrets;
