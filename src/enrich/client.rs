use std::net::IpAddr;
use std::time::Duration;

use crate::config::FetchConfig;

/// One factory for every outbound client; only the timeout differs per
/// call site, so the timeout policy stays centrally testable.
pub fn build_client(
    config: &FetchConfig,
    timeout: Duration,
) -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(&config.user_agent)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .danger_accept_invalid_hostnames(config.accept_invalid_certs)
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(10))
        .build()
}

fn is_ip_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

fn is_private_ip(host: &str) -> bool {
    use std::net::ToSocketAddrs;

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_ip_private(&ip);
    }

    if let Ok(addrs) = (host, 80).to_socket_addrs() {
        for addr in addrs {
            if is_ip_private(&addr.ip()) {
                return true;
            }
        }
    }

    false
}

/// Outbound policy gate, checked before any request leaves the process.
pub fn url_allowed(url: &url::Url, config: &FetchConfig) -> bool {
    if !config.allowed_schemes.iter().any(|s| s == url.scheme()) {
        log::warn!("URL scheme '{}' not allowed", url.scheme());
        return false;
    }

    let host = url.host_str().unwrap_or_default();

    if config.blocked_hosts.iter().any(|h| h == host) {
        log::warn!("Host '{}' is blocked", host);
        return false;
    }

    if config.block_private_ips && is_private_ip(host) {
        log::warn!("Host '{}' resolves to private IP (blocked by SSRF policy)", host);
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_default_policy_allows_http_and_https() {
        let config = FetchConfig::default();
        assert!(url_allowed(
            &Url::parse("https://example.com").unwrap(),
            &config
        ));
        assert!(url_allowed(
            &Url::parse("http://example.com").unwrap(),
            &config
        ));
    }

    #[test]
    fn test_unknown_scheme_denied() {
        let config = FetchConfig::default();
        assert!(!url_allowed(
            &Url::parse("ftp://example.com/favicon.ico").unwrap(),
            &config
        ));
        assert!(!url_allowed(&Url::parse("file:///etc/passwd").unwrap(), &config));
    }

    #[test]
    fn test_blocked_host_denied() {
        let config = FetchConfig {
            blocked_hosts: vec!["tracker.example".to_string()],
            ..Default::default()
        };
        assert!(!url_allowed(
            &Url::parse("https://tracker.example/icon.png").unwrap(),
            &config
        ));
        assert!(url_allowed(
            &Url::parse("https://example.com").unwrap(),
            &config
        ));
    }

    #[test]
    fn test_loopback_denied_only_when_opted_in() {
        let open = FetchConfig::default();
        assert!(url_allowed(&Url::parse("http://127.0.0.1:8080").unwrap(), &open));

        let strict = FetchConfig {
            block_private_ips: true,
            ..Default::default()
        };
        assert!(!url_allowed(
            &Url::parse("http://127.0.0.1:8080").unwrap(),
            &strict
        ));
        assert!(!url_allowed(&Url::parse("http://10.0.0.5").unwrap(), &strict));
    }
}
