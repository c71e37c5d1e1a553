//! Delivery timing and outbound proxy settings.

use std::time::Duration;
use url::Url;

/// How outbound HTTP requests reach the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Connect directly, ignoring proxy environment variables.
    #[default]
    Direct,
    /// Use the proxy from the environment (`HTTPS_PROXY` and friends).
    System,
    /// Route every request through this proxy.
    Explicit(Url),
}

/// Settings applied to every outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Delay between receiving an event and sending it.
    pub notification_delay: Duration,
    /// Upper bound on a single transport call.
    pub send_timeout: Duration,
    pub proxy: ProxyConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            notification_delay: Duration::ZERO,
            send_timeout: Duration::from_secs(10),
            proxy: ProxyConfig::Direct,
        }
    }
}
