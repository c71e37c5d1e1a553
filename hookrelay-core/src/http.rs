//! Shared outbound HTTP client.

use hookrelay_sdk::config::{DeliveryConfig, ProxyConfig};

/// Build the client used by the feed fetcher and the HTTP channels.
///
/// `Direct` disables every proxy including the environment's, `System`
/// keeps reqwest's environment lookup, `Explicit` routes all schemes
/// through the given URL.
pub fn build_client(delivery: &DeliveryConfig) -> Result<reqwest::Client, reqwest::Error> {
    let builder = reqwest::Client::builder()
        .timeout(delivery.send_timeout)
        .user_agent(concat!("hookrelay/", env!("CARGO_PKG_VERSION")));

    let builder = match &delivery.proxy {
        ProxyConfig::Direct => builder.no_proxy(),
        ProxyConfig::System => builder,
        ProxyConfig::Explicit(url) => builder.proxy(reqwest::Proxy::all(url.as_str())?),
    };

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_builds_for_every_proxy_mode() {
        for proxy in [
            ProxyConfig::Direct,
            ProxyConfig::System,
            ProxyConfig::Explicit(Url::parse("http://127.0.0.1:7890").unwrap()),
        ] {
            let delivery = DeliveryConfig {
                proxy,
                ..DeliveryConfig::default()
            };
            assert!(build_client(&delivery).is_ok());
        }
    }
}
