//! API data transfer objects.
//!
//! These types define the JSON contract shared between the server, the CLI
//! and the dashboard frontend. Top-level snapshot fields are camelCase and
//! nested blocks are snake_case, matching what the frontend reads.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Health of the site or of a single device.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Site status implied by a set of active alerts.
    ///
    /// Any critical alert makes the site critical; any other alert makes it
    /// a warning.
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        match alerts.iter().map(|a| a.severity).max() {
            Some(Severity::Critical) => Self::Critical,
            Some(_) => Self::Warning,
            None => Self::Normal,
        }
    }
}

/// Link state between the site controller and its telemetry source.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Connection {
    #[default]
    Online,
    Offline,
}

/// Alert severity. Ordered from least to most severe.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Point-in-time telemetry for one site.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub site_name: String,
    pub device_id: String,
    /// RFC 3339.
    pub timestamp: String,
    pub system: SystemBlock,
    pub battery: BatteryBlock,
    pub safety: SafetyBlock,
    pub power: PowerBlock,
    pub devices: Vec<DeviceReading>,
    pub alerts: Vec<Alert>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct SystemBlock {
    pub status: HealthStatus,
    pub uptime: String,
    pub connection: Connection,
    /// Grid frequency (Hz).
    pub frequency: f64,
    pub bus_voltage: f64,
    pub real_power_kw: f64,
    pub reactive_power_kvar: f64,
    /// Control-loop compliance (%).
    pub execution_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct BatteryBlock {
    /// State of charge (%), always within 0..=100.
    pub soc: f64,
    /// State of health (%).
    pub soh: f64,
    pub voltage: f64,
    pub current: f64,
    pub temp: f64,
    pub max_temp: TemperaturePoint,
    pub min_temp: TemperaturePoint,
}

/// A temperature extreme and where it was measured.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct TemperaturePoint {
    pub value: f64,
    pub position: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct SafetyBlock {
    pub fire_alarm: bool,
    pub door_status: String,
    pub emergency_stop: bool,
}

/// Site power flows (kW).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct PowerBlock {
    pub pv_kw: f64,
    pub load_kw: f64,
    pub grid_kw: f64,
    pub battery_kw: f64,
}

/// Reading from one battery rack or container.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct DeviceReading {
    pub id: String,
    pub name: String,
    pub status: HealthStatus,
    pub soc: f64,
    pub temp: f64,
    pub voltage: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    /// RFC 3339.
    pub time: String,
}

/// One sample of a history series.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct HistoryPoint {
    /// RFC 3339.
    pub time: String,
    pub soc: f64,
    /// Real power (kW).
    pub power: f64,
    pub frequency: f64,
    pub execution_rate: f64,
    /// Reactive power (kvar).
    pub reactive_power: f64,
}

/// Entry of the site listing.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct SiteSummary {
    pub key: String,
    pub name: String,
}
