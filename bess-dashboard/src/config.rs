//! Process configuration read from the environment at startup.
//!
//! Values are looked up through a closure so tests can supply them without
//! touching the process environment.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:7786";

/// Server-side bound on a single upstream request.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for the device API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,

    /// Device identifier per site key.
    pub device_ids: HashMap<String, String>,

    pub timeout: Duration,

    /// Accept base URLs on loopback or private networks. Off by default:
    /// such addresses usually point at an unconfigured development default.
    pub allow_private: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            device_ids: HashMap::new(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            allow_private: false,
        }
    }
}

impl UpstreamConfig {
    pub fn from_env(site_keys: &[&str]) -> Result<Self> {
        Self::from_lookup(site_keys, |key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as
    /// unset.
    pub fn from_lookup(
        site_keys: &[&str],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let device_ids = site_keys
            .iter()
            .filter_map(|site| {
                let var = format!("BESS_DEVICE_ID_{}", site.to_ascii_uppercase());
                get(&var).map(|id| (site.to_ascii_lowercase(), id))
            })
            .collect();

        let timeout = match get("BESS_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        let allow_private = match get("BESS_ALLOW_PRIVATE_UPSTREAM") {
            Some(raw) => parse_bool("BESS_ALLOW_PRIVATE_UPSTREAM", &raw)?,
            None => false,
        };

        Ok(Self {
            base_url: get("BESS_API_URL"),
            api_key: get("BESS_API_KEY"),
            device_ids,
            timeout,
            allow_private,
        })
    }

    pub fn device_id(&self, site_key: &str) -> Option<&str> {
        self.device_ids
            .get(&site_key.trim().to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Configuration of the dashboard daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub upstream: UpstreamConfig,
}

impl ServerConfig {
    pub fn from_env(site_keys: &[&str]) -> Result<Self> {
        Self::from_lookup(site_keys, |key| env::var(key).ok())
    }

    pub fn from_lookup(
        site_keys: &[&str],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let listen = lookup("BESS_LISTEN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_owned());
        let listen = listen
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("BESS_LISTEN={listen}: {e}")))?;

        Ok(Self {
            listen,
            upstream: UpstreamConfig::from_lookup(site_keys, lookup)?,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .parse()
        .map_err(|e| Error::Config(format!("BESS_UPSTREAM_TIMEOUT_SECS={raw}: {e}")))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(Error::Config(format!(
            "BESS_UPSTREAM_TIMEOUT_SECS={raw}: must be a positive number of seconds"
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_bool(var: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{var}={raw}: expected true or false"))),
    }
}
