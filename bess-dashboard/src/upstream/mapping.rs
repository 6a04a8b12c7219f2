//! Normalization of device API payloads into the canonical schema.
//!
//! The device API has shipped several spellings of the same fields over
//! time. Each logical field lists its candidate keys; the first one
//! present with a non-null value wins. Keys may be dotted paths into
//! nested objects. Anything missing falls back to a neutral value (0,
//! `"N/A"`, `false`, empty list) instead of rejecting the payload.

use serde_json::Value;
use time::OffsetDateTime;

use crate::api_client::types::{
    Alert, BatteryBlock, Connection, DeviceReading, HealthStatus, HistoryPoint, PowerBlock,
    SafetyBlock, Severity, StatusSnapshot, SystemBlock, TemperaturePoint,
};
use crate::site::SiteConfig;
use crate::types::format_rfc3339;

const NOT_AVAILABLE: &str = "N/A";

/// Build a snapshot from a status payload.
///
/// `site` supplies the display name when the payload carries none;
/// `device_id` is the id the request was made for.
pub fn map_status(
    site_key: &str,
    site: &SiteConfig,
    device_id: &str,
    payload: &Value,
    now: OffsetDateTime,
) -> StatusSnapshot {
    let root = Fields(unwrap_envelope(payload));
    let timestamp = root
        .timestamp(&["timestamp", "time", "ts", "updatedAt", "updated_at"])
        .unwrap_or_else(|| format_rfc3339(now));

    let devices = root
        .array(&["devices", "racks", "modules", "battery.racks"])
        .iter()
        .enumerate()
        .map(|(i, v)| map_device(i, v))
        .collect();

    let alerts: Vec<Alert> = root
        .array(&["alerts", "alarms", "events"])
        .iter()
        .enumerate()
        .map(|(i, v)| map_alert(site_key, i, v, &timestamp))
        .collect();

    let system = SystemBlock {
        status: HealthStatus::from_alerts(&alerts),
        uptime: root
            .string(&["system.uptime", "uptime"])
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        connection: root
            .string(&["system.connection", "connection"])
            .and_then(|s| s.to_ascii_lowercase().parse().ok())
            .unwrap_or(Connection::Online),
        frequency: root.f64_or_zero(&["system.frequency", "frequency", "grid.frequency", "freq"]),
        bus_voltage: root.f64_or_zero(&[
            "system.bus_voltage",
            "bus_voltage",
            "busVoltage",
            "dc_bus_voltage",
        ]),
        real_power_kw: root.f64_or_zero(&[
            "system.real_power_kw",
            "real_power_kw",
            "realPower",
            "active_power",
            "activePower",
        ]),
        reactive_power_kvar: root.f64_or_zero(&[
            "system.reactive_power_kvar",
            "reactive_power_kvar",
            "reactivePower",
            "reactive_power",
        ]),
        execution_rate: root.f64_or_zero(&[
            "system.execution_rate",
            "execution_rate",
            "executionRate",
        ]),
        service_type: root
            .f64(&["system.service_type", "service_type", "serviceType"])
            .filter(|v| (0.0..=f64::from(u8::MAX)).contains(v))
            .map(|v| v as u8),
    };

    let battery = BatteryBlock {
        soc: root
            .f64_or_zero(&[
                "battery.soc",
                "soc",
                "SOC",
                "stateOfCharge",
                "state_of_charge",
            ])
            .clamp(0.0, 100.0),
        soh: root.f64_or_zero(&[
            "battery.soh",
            "soh",
            "SOH",
            "stateOfHealth",
            "state_of_health",
        ]),
        voltage: root.f64_or_zero(&[
            "battery.voltage",
            "battery_voltage",
            "batteryVoltage",
            "voltage",
        ]),
        current: root.f64_or_zero(&[
            "battery.current",
            "battery_current",
            "batteryCurrent",
            "current",
        ]),
        temp: root.f64_or_zero(&[
            "battery.temp",
            "battery.temperature",
            "temperature",
            "temp",
        ]),
        max_temp: root.temperature_point(
            &["battery.max_temp.value", "battery.max_temp", "max_temp", "maxTemp"],
            &["battery.max_temp.position", "max_temp_position", "maxTempPosition"],
        ),
        min_temp: root.temperature_point(
            &["battery.min_temp.value", "battery.min_temp", "min_temp", "minTemp"],
            &["battery.min_temp.position", "min_temp_position", "minTempPosition"],
        ),
    };

    let safety = SafetyBlock {
        fire_alarm: root.bool_or_false(&["safety.fire_alarm", "fire_alarm", "fireAlarm"]),
        door_status: root
            .string(&["safety.door_status", "door_status", "doorStatus"])
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        emergency_stop: root.bool_or_false(&[
            "safety.emergency_stop",
            "emergency_stop",
            "emergencyStop",
            "estop",
        ]),
    };

    let power = PowerBlock {
        pv_kw: root.f64_or_zero(&["power.pv_kw", "pv_kw", "pvPower", "pv_power"]),
        load_kw: root.f64_or_zero(&["power.load_kw", "load_kw", "loadPower", "load_power"]),
        grid_kw: root.f64_or_zero(&["power.grid_kw", "grid_kw", "gridPower", "grid_power"]),
        battery_kw: root.f64_or_zero(&[
            "power.battery_kw",
            "battery_kw",
            "batteryPower",
            "battery_power",
        ]),
    };

    StatusSnapshot {
        site_name: root
            .string(&["siteName", "site_name", "site.name"])
            .unwrap_or_else(|| site.name.clone()),
        device_id: root
            .string(&["deviceId", "device_id", "sn", "serial"])
            .unwrap_or_else(|| device_id.to_owned()),
        timestamp,
        system,
        battery,
        safety,
        power,
        devices,
        alerts,
    }
}

/// Build a history series from a history payload.
///
/// Accepts a bare array, an array under a `data` envelope, or an object
/// holding the array under a history-like key. Anything else is an empty
/// series. Entries that are not objects are skipped.
pub fn map_history(payload: &Value) -> Vec<HistoryPoint> {
    let root = unwrap_envelope(payload);
    let entries = match root {
        Value::Array(entries) => entries.as_slice(),
        _ => Fields(root).array(&["history", "points", "items", "records"]),
    };

    entries
        .iter()
        .filter(|v| v.is_object())
        .map(|v| {
            let point = Fields(v);
            HistoryPoint {
                time: point
                    .timestamp(&["time", "timestamp", "ts", "t"])
                    .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
                soc: point
                    .f64_or_zero(&["soc", "SOC", "stateOfCharge", "state_of_charge"])
                    .clamp(0.0, 100.0),
                power: point.f64_or_zero(&["power", "power_kw", "real_power_kw", "realPower"]),
                frequency: point.f64_or_zero(&["frequency", "freq"]),
                execution_rate: point.f64_or_zero(&["execution_rate", "executionRate"]),
                reactive_power: point.f64_or_zero(&[
                    "reactive_power",
                    "reactive_power_kvar",
                    "reactivePower",
                ]),
            }
        })
        .collect()
}

fn map_device(index: usize, value: &Value) -> DeviceReading {
    let device = Fields(value);
    DeviceReading {
        id: device
            .string(&["id", "deviceId", "device_id", "sn"])
            .unwrap_or_else(|| (index + 1).to_string()),
        name: device
            .string(&["name", "label", "deviceName", "id"])
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        status: device
            .string(&["status", "state"])
            .and_then(|s| s.to_ascii_lowercase().parse().ok())
            .unwrap_or_default(),
        soc: device
            .f64_or_zero(&["soc", "SOC", "stateOfCharge"])
            .clamp(0.0, 100.0),
        temp: device.f64_or_zero(&["temp", "temperature"]),
        voltage: device.f64_or_zero(&["voltage", "volt"]),
    }
}

fn map_alert(site_key: &str, index: usize, value: &Value, snapshot_time: &str) -> Alert {
    let alert = Fields(value);
    Alert {
        id: alert
            .string(&["id", "alertId", "code"])
            .unwrap_or_else(|| format!("{site_key}-upstream-{index}")),
        severity: alert
            .string(&["type", "severity", "level"])
            .and_then(|s| s.to_ascii_lowercase().parse().ok())
            .unwrap_or(Severity::Info),
        message: alert
            .string(&["message", "msg", "description", "text"])
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        time: alert
            .timestamp(&["time", "timestamp", "ts"])
            .unwrap_or_else(|| snapshot_time.to_owned()),
    }
}

/// The payload proper, if it is wrapped as `{"data": ...}`.
fn unwrap_envelope(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(inner @ (Value::Object(_) | Value::Array(_))) => inner,
        _ => payload,
    }
}

/// Candidate-key accessors over a JSON value.
struct Fields<'a>(&'a Value);

impl<'a> Fields<'a> {
    fn lookup(&self, candidates: &[&str]) -> Option<&'a Value> {
        candidates
            .iter()
            .filter_map(|path| {
                path.split('.')
                    .try_fold(self.0, |value, key| value.get(key))
            })
            .find(|value| !value.is_null())
    }

    /// Numbers, or strings holding numbers.
    fn f64(&self, candidates: &[&str]) -> Option<f64> {
        candidates
            .iter()
            .filter_map(|path| self.lookup(std::slice::from_ref(path)))
            .find_map(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .filter(|v| v.is_finite())
    }

    fn f64_or_zero(&self, candidates: &[&str]) -> f64 {
        self.f64(candidates).unwrap_or(0.0)
    }

    fn string(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .filter_map(|path| self.lookup(std::slice::from_ref(path)))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    fn bool_or_false(&self, candidates: &[&str]) -> bool {
        self.lookup(candidates)
            .and_then(|value| match value {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => n.as_f64().map(|v| v != 0.0),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(true),
                    "false" | "0" | "no" | "off" => Some(false),
                    _ => None,
                },
                _ => None,
            })
            .unwrap_or(false)
    }

    fn array(&self, candidates: &[&str]) -> &'a [Value] {
        self.lookup(candidates)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// RFC 3339 strings pass through; numbers are Unix seconds, or
    /// milliseconds when too large to be seconds.
    fn timestamp(&self, candidates: &[&str]) -> Option<String> {
        match self.lookup(candidates)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => {
                let raw = n.as_f64()?;
                let nanos = if raw.abs() >= 1e12 {
                    raw * 1e6
                } else {
                    raw * 1e9
                };
                OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
                    .ok()
                    .map(format_rfc3339)
            }
            _ => None,
        }
    }

    fn temperature_point(&self, value: &[&str], position: &[&str]) -> TemperaturePoint {
        TemperaturePoint {
            value: self.f64_or_zero(value),
            position: self
                .string(position)
                .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    const NOW: OffsetDateTime = datetime!(2026-10-18 12:00 UTC);

    fn site() -> SiteConfig {
        SiteConfig {
            name: "Chiayi BESS".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn canonical_payload_maps_one_to_one() {
        let payload = json!({
            "siteName": "Chiayi Plant",
            "deviceId": "CY-0001",
            "timestamp": "2026-10-18T11:59:58Z",
            "system": {
                "uptime": "10d 1h 0m",
                "connection": "online",
                "frequency": 59.98,
                "bus_voltage": 1201.5,
                "real_power_kw": 470.2,
                "reactive_power_kvar": 33.1,
                "execution_rate": 99.4,
                "service_type": 2
            },
            "battery": {
                "soc": 71.5, "soh": 98.0, "voltage": 768.2, "current": 612.0, "temp": 28.1,
                "max_temp": {"value": 31.0, "position": "Rack 3"},
                "min_temp": {"value": 26.5, "position": "Rack 7"}
            },
            "safety": {"fire_alarm": false, "door_status": "closed", "emergency_stop": false},
            "power": {"pv_kw": 15.0, "load_kw": 12.0, "grid_kw": -473.2, "battery_kw": 470.2},
            "devices": [
                {"id": "r1", "name": "Rack 1", "status": "warning", "soc": 70.0, "temp": 29.0, "voltage": 768.0}
            ],
            "alerts": [
                {"id": "a1", "type": "warning", "message": "Fan degraded", "time": "2026-10-18T11:00:00Z"}
            ]
        });

        let snapshot = map_status("chiayi", &site(), "CY-0001", &payload, NOW);

        assert_eq!(snapshot.site_name, "Chiayi Plant");
        assert_eq!(snapshot.timestamp, "2026-10-18T11:59:58Z");
        assert_eq!(snapshot.system.frequency, 59.98);
        assert_eq!(snapshot.system.service_type, Some(2));
        assert_eq!(snapshot.battery.max_temp.position, "Rack 3");
        assert_eq!(snapshot.power.grid_kw, -473.2);
        assert_eq!(snapshot.devices[0].status, HealthStatus::Warning);
        assert_eq!(snapshot.alerts[0].severity, Severity::Warning);
        assert_eq!(snapshot.system.status, HealthStatus::Warning);
    }

    #[test]
    fn alternate_spellings_and_envelope_are_accepted() {
        let payload = json!({
            "data": {
                "SOC": "64.2",
                "stateOfHealth": 97,
                "activePower": -120.5,
                "freq": 60.01,
                "fireAlarm": 1,
                "racks": [{"sn": "XY-9", "temperature": 30.2, "state": "CRITICAL"}],
                "alarms": [{"level": "critical", "msg": "Smoke detected"}],
                "ts": 1_791_720_000
            }
        });

        let snapshot = map_status("xinying", &site(), "XY-0001", &payload, NOW);

        assert_eq!(snapshot.battery.soc, 64.2);
        assert_eq!(snapshot.battery.soh, 97.0);
        assert_eq!(snapshot.system.real_power_kw, -120.5);
        assert_eq!(snapshot.system.frequency, 60.01);
        assert!(snapshot.safety.fire_alarm);
        assert_eq!(snapshot.devices[0].id, "XY-9");
        assert_eq!(snapshot.devices[0].status, HealthStatus::Critical);
        assert_eq!(snapshot.alerts[0].id, "xinying-upstream-0");
        assert_eq!(snapshot.system.status, HealthStatus::Critical);
        assert!(snapshot.timestamp.starts_with("2026-10-"));
    }

    #[test]
    fn first_non_null_candidate_wins() {
        let payload = json!({"soc": null, "SOC": 40.0, "stateOfCharge": 90.0});
        let snapshot = map_status("chiayi", &site(), "CY-0001", &payload, NOW);
        assert_eq!(snapshot.battery.soc, 40.0);
    }

    #[test]
    fn empty_payload_defaults_to_neutral_values() {
        let snapshot = map_status("chiayi", &site(), "CY-0001", &json!({}), NOW);

        assert_eq!(snapshot.site_name, "Chiayi BESS");
        assert_eq!(snapshot.device_id, "CY-0001");
        assert_eq!(snapshot.timestamp, "2026-10-18T12:00:00Z");
        assert_eq!(snapshot.system.uptime, "N/A");
        assert_eq!(snapshot.system.status, HealthStatus::Normal);
        assert_eq!(snapshot.system.service_type, None);
        assert_eq!(snapshot.battery.soc, 0.0);
        assert_eq!(snapshot.battery.min_temp.position, "N/A");
        assert_eq!(snapshot.safety.door_status, "N/A");
        assert!(!snapshot.safety.emergency_stop);
        assert!(snapshot.devices.is_empty());
        assert!(snapshot.alerts.is_empty());
    }

    #[test]
    fn out_of_range_soc_is_clamped() {
        let payload = json!({"soc": 104.0, "devices": [{"soc": -3}]});
        let snapshot = map_status("chiayi", &site(), "CY-0001", &payload, NOW);
        assert_eq!(snapshot.battery.soc, 100.0);
        assert_eq!(snapshot.devices[0].soc, 0.0);
    }

    #[test]
    fn history_from_bare_array() {
        let payload = json!([
            {"time": "2026-10-18T00:00:00Z", "soc": 50, "power": 10.5, "frequency": 60.0,
             "execution_rate": 99.0, "reactive_power": 3.0},
            {"timestamp": 1_791_720_000_000_i64, "SOC": 51, "realPower": 11.0},
            "garbage"
        ]);

        let points = map_history(&payload);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].power, 10.5);
        assert_eq!(points[1].soc, 51.0);
        assert!(points[1].time.ends_with('Z'));
        assert_eq!(points[1].frequency, 0.0);
    }

    #[test]
    fn history_from_wrapped_shapes() {
        let enveloped = json!({"data": [{"time": "t0", "soc": 10}]});
        assert_eq!(map_history(&enveloped).len(), 1);

        let keyed = json!({"points": [{"time": "t0"}, {"time": "t1"}]});
        assert_eq!(map_history(&keyed).len(), 2);
    }

    #[test]
    fn unusable_history_is_empty() {
        assert!(map_history(&json!({"message": "no data"})).is_empty());
        assert!(map_history(&json!(null)).is_empty());
    }
}
