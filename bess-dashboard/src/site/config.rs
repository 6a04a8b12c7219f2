//! Per-site baseline operating values.
//!
//! The mock generator draws jittered readings around these baselines, and
//! the upstream mapper falls back to them for display-only fields such as
//! the site name.

use std::collections::HashMap;

/// Baseline operating characteristics of one BESS site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    /// Display name shown on the dashboard.
    pub name: String,

    /// Nominal state of charge (%).
    pub soc: f64,

    /// State of health (%).
    pub soh: f64,

    /// Baseline real power (kW). Positive means discharging.
    pub real_power_kw: f64,

    /// Baseline reactive power (kvar).
    pub reactive_power_kvar: f64,

    /// Nominal grid frequency (Hz).
    pub frequency_hz: f64,

    /// DC bus voltage (V).
    pub bus_voltage: f64,

    /// Number of battery containers/racks reported as devices.
    pub device_count: usize,

    /// Device names are `{prefix}-{NN}`.
    pub device_prefix: String,

    /// Baseline cell temperature (°C).
    pub temperature_c: f64,

    /// Baseline pack voltage (V).
    pub voltage: f64,

    /// Pre-formatted uptime, e.g. `"124d 14h 22m"`.
    pub uptime: String,

    /// Grid ancillary-service program code, if the site is enrolled in one.
    pub service_type: Option<u8>,

    /// Baseline PV generation (kW).
    pub pv_kw: f64,

    /// Baseline site load (kW).
    pub load_kw: f64,

    /// Non-operational sites (commissioning, maintenance) report no power
    /// flow and a zero execution rate.
    pub is_operational: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Generic BESS Site".to_owned(),
            soc: 60.0,
            soh: 98.0,
            real_power_kw: 250.0,
            reactive_power_kvar: 20.0,
            frequency_hz: 60.0,
            bus_voltage: 750.0,
            device_count: 6,
            device_prefix: "BESS".to_owned(),
            temperature_c: 28.0,
            voltage: 720.0,
            uptime: "30d 0h 0m".to_owned(),
            service_type: None,
            pv_kw: 15.0,
            load_kw: 12.0,
            is_operational: true,
        }
    }
}

/// Lookup of site configuration by key.
///
/// Unknown keys resolve to a generic default rather than failing.
pub trait SiteConfigProvider: Send + Sync {
    fn site(&self, key: &str) -> &SiteConfig;

    /// Known site keys, sorted.
    fn keys(&self) -> Vec<&str>;
}

/// Immutable site table built once at startup.
#[derive(Debug, Clone)]
pub struct SiteTable {
    sites: HashMap<String, SiteConfig>,
    fallback: SiteConfig,
}

impl SiteTable {
    pub fn new(sites: impl IntoIterator<Item = (String, SiteConfig)>, fallback: SiteConfig) -> Self {
        Self {
            sites: sites
                .into_iter()
                .map(|(key, config)| (normalize_key(&key), config))
                .collect(),
            fallback,
        }
    }

    /// The sites this deployment monitors.
    pub fn builtin() -> Self {
        let chiayi = SiteConfig {
            name: "Chiayi BESS".to_owned(),
            soc: 72.0,
            soh: 98.2,
            real_power_kw: 480.0,
            reactive_power_kvar: 35.0,
            frequency_hz: 60.0,
            bus_voltage: 1200.0,
            device_count: 8,
            device_prefix: "CY-RACK".to_owned(),
            temperature_c: 27.5,
            voltage: 768.0,
            uptime: "124d 14h 22m".to_owned(),
            service_type: Some(1),
            pv_kw: 15.5,
            load_kw: 12.0,
            is_operational: true,
        };
        let xinying = SiteConfig {
            name: "Xinying BESS".to_owned(),
            soc: 55.0,
            soh: 99.1,
            real_power_kw: 300.0,
            reactive_power_kvar: 18.0,
            frequency_hz: 60.0,
            bus_voltage: 1000.0,
            device_count: 4,
            device_prefix: "XY-RACK".to_owned(),
            temperature_c: 25.0,
            voltage: 716.8,
            uptime: "3d 2h 10m".to_owned(),
            service_type: Some(3),
            pv_kw: 8.0,
            load_kw: 6.5,
            is_operational: false,
        };

        Self::new(
            [
                ("chiayi".to_owned(), chiayi),
                ("xinying".to_owned(), xinying),
            ],
            SiteConfig::default(),
        )
    }
}

impl SiteConfigProvider for SiteTable {
    fn site(&self, key: &str) -> &SiteConfig {
        self.sites.get(&normalize_key(key)).unwrap_or(&self.fallback)
    }

    fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sites.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
