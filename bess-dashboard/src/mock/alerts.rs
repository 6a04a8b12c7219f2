//! Threshold checks that turn a set of readings into alerts.
//!
//! This is the only deterministic step of mock generation: given the same
//! readings, the same alerts (modulo ids) come out.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;

use crate::api_client::types::{Alert, DeviceReading, Severity};
use crate::types::format_rfc3339;

/// State of charge below which a low-charge warning is raised (%).
pub const LOW_SOC_PERCENT: f64 = 20.0;

/// Aggregate temperature above which a critical alert is raised (°C).
pub const HIGH_TEMPERATURE_C: f64 = 45.0;

/// Disambiguates alerts created within the same millisecond.
static ALERT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Readings the alert rules look at.
#[derive(Debug, Clone, Copy)]
pub struct AlertInputs<'a> {
    pub soc: f64,
    pub temperature_c: f64,
    pub fire_alarm: bool,
    pub devices: &'a [DeviceReading],
}

/// Evaluate the alert rules for one snapshot.
///
/// Order is stable: system charge, per-device charge, temperature, fire.
pub fn derive_alerts(site_key: &str, inputs: AlertInputs<'_>, now: OffsetDateTime) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut raise = |kind: &str, severity: Severity, message: String| {
        alerts.push(Alert {
            id: alert_id(site_key, kind, now),
            severity,
            message,
            time: format_rfc3339(now),
        });
    };

    if inputs.soc < LOW_SOC_PERCENT {
        raise(
            "low-soc",
            Severity::Warning,
            format!("System state of charge low: {:.1}%", inputs.soc),
        );
    }

    for device in inputs.devices.iter().filter(|d| d.soc < LOW_SOC_PERCENT) {
        raise(
            &format!("low-soc-{}", device.id),
            Severity::Warning,
            format!("{} state of charge low: {:.1}%", device.name, device.soc),
        );
    }

    if inputs.temperature_c > HIGH_TEMPERATURE_C {
        raise(
            "high-temp",
            Severity::Critical,
            format!("Battery temperature high: {:.1}°C", inputs.temperature_c),
        );
    }

    if inputs.fire_alarm {
        raise(
            "fire",
            Severity::Critical,
            "Fire alarm triggered".to_owned(),
        );
    }

    alerts
}

fn alert_id(site_key: &str, kind: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let seq = ALERT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{site_key}-{kind}-{millis}-{seq}")
}
