//! Whether the configured device API should be called at all.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use reqwest::Url;

use crate::config::UpstreamConfig;

/// API keys shipped in example configuration files. Seeing one of these
/// means nobody filled in a real key.
pub const PLACEHOLDER_API_KEYS: &[&str] = &[
    "YOUR_API_KEY",
    "YOUR_API_KEY_HERE",
    "MY_API_KEY",
    "API_KEY",
    "CHANGEME",
    "<API_KEY>",
];

/// Why the device API is not called.
///
/// These are the expected steady state of demo and development
/// deployments, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unconfigured {
    MissingBaseUrl,
    InvalidBaseUrl(String),
    MissingApiKey,
    PlaceholderApiKey,
    PrivateNetwork(String),
    MissingDeviceId(String),
}

impl fmt::Display for Unconfigured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unconfigured::MissingBaseUrl => write!(f, "no base URL set"),
            Unconfigured::InvalidBaseUrl(url) => write!(f, "base URL {url:?} is not an http(s) URL"),
            Unconfigured::MissingApiKey => write!(f, "no API key set"),
            Unconfigured::PlaceholderApiKey => write!(f, "API key is a placeholder"),
            Unconfigured::PrivateNetwork(host) => {
                write!(f, "base URL host {host} is on a loopback or private network")
            }
            Unconfigured::MissingDeviceId(site) => write!(f, "no device id for site {site:?}"),
        }
    }
}

/// A device API endpoint that passed [`check_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub api_key: String,
}

/// Validate the site-independent upstream parameters.
pub fn check_endpoint(config: &UpstreamConfig) -> Result<Endpoint, Unconfigured> {
    let raw_url = config
        .base_url
        .as_deref()
        .ok_or(Unconfigured::MissingBaseUrl)?;
    let api_key = config.api_key.as_deref().ok_or(Unconfigured::MissingApiKey)?;

    if PLACEHOLDER_API_KEYS
        .iter()
        .any(|placeholder| placeholder.eq_ignore_ascii_case(api_key))
    {
        return Err(Unconfigured::PlaceholderApiKey);
    }

    let url = Url::parse(raw_url).map_err(|_| Unconfigured::InvalidBaseUrl(raw_url.to_owned()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Unconfigured::InvalidBaseUrl(raw_url.to_owned()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| Unconfigured::InvalidBaseUrl(raw_url.to_owned()))?;

    if !config.allow_private && is_private_host(host) {
        return Err(Unconfigured::PrivateNetwork(host.to_owned()));
    }

    Ok(Endpoint {
        base_url: raw_url.trim_end_matches('/').to_owned(),
        api_key: api_key.to_owned(),
    })
}

/// Loopback, private, link-local and unspecified addresses, plus
/// `localhost` names. IPv6 hosts may be given with or without brackets.
pub fn is_private_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => is_private_v4(v4),
            IpAddr::V6(v6) => is_private_v6(v6),
        };
    }

    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost" || host.ends_with(".localhost")
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    let unique_local = first & 0xfe00 == 0xfc00;
    let link_local = first & 0xffc0 == 0xfe80;
    ip.is_loopback() || ip.is_unspecified() || unique_local || link_local
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn config(url: &str, key: &str) -> UpstreamConfig {
        UpstreamConfig {
            base_url: Some(url.to_owned()),
            api_key: Some(key.to_owned()),
            ..Default::default()
        }
    }

    #[test_case("127.0.0.1" => true; "loopback v4")]
    #[test_case("127.8.9.10" => true; "loopback range")]
    #[test_case("10.0.0.5" => true; "rfc1918 10")]
    #[test_case("172.16.4.1" => true; "rfc1918 172")]
    #[test_case("172.32.0.1" => false; "just past 172.16/12")]
    #[test_case("192.168.1.20" => true; "rfc1918 192")]
    #[test_case("169.254.0.1" => true; "link local v4")]
    #[test_case("0.0.0.0" => true; "unspecified")]
    #[test_case("[::1]" => true; "loopback v6")]
    #[test_case("fd12:3456::1" => true; "unique local v6")]
    #[test_case("fe80::1" => true; "link local v6")]
    #[test_case("::ffff:192.168.0.1" => true; "mapped private v4")]
    #[test_case("localhost" => true; "localhost")]
    #[test_case("api.localhost" => true; "localhost subdomain")]
    #[test_case("8.8.8.8" => false; "public v4")]
    #[test_case("2001:db8::1" => false; "public v6")]
    #[test_case("ems.example.com" => false; "public name")]
    fn private_host_detection(host: &str) -> bool {
        is_private_host(host)
    }

    #[test]
    fn accepts_public_endpoint() {
        let endpoint = check_endpoint(&config("https://ems.example.com/api/", "k3y")).unwrap();
        assert_eq!(endpoint.base_url, "https://ems.example.com/api");
        assert_eq!(endpoint.api_key, "k3y");
    }

    #[test]
    fn missing_parameters_are_unconfigured() {
        let mut no_url = config("https://ems.example.com", "k3y");
        no_url.base_url = None;
        assert_eq!(check_endpoint(&no_url), Err(Unconfigured::MissingBaseUrl));

        let mut no_key = config("https://ems.example.com", "k3y");
        no_key.api_key = None;
        assert_eq!(check_endpoint(&no_key), Err(Unconfigured::MissingApiKey));
    }

    #[test_case("YOUR_API_KEY"; "upper")]
    #[test_case("your_api_key_here"; "lower")]
    #[test_case("changeme"; "changeme")]
    fn placeholder_keys_are_unconfigured(key: &str) {
        assert_eq!(
            check_endpoint(&config("https://ems.example.com", key)),
            Err(Unconfigured::PlaceholderApiKey)
        );
    }

    #[test]
    fn private_endpoint_needs_opt_in() {
        let mut config = config("http://192.168.10.2:8080", "k3y");
        assert_eq!(
            check_endpoint(&config),
            Err(Unconfigured::PrivateNetwork("192.168.10.2".to_owned()))
        );

        config.allow_private = true;
        assert!(check_endpoint(&config).is_ok());
    }

    #[test_case("ftp://ems.example.com"; "wrong scheme")]
    #[test_case("ems.example.com"; "no scheme")]
    fn malformed_urls_are_unconfigured(url: &str) {
        assert!(matches!(
            check_endpoint(&config(url, "k3y")),
            Err(Unconfigured::InvalidBaseUrl(_))
        ));
    }
}
