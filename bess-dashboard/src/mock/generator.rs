//! Randomized telemetry around per-site baselines.
//!
//! Shapes are fixed by the site configuration (device count, names, which
//! blocks are present); values are baseline plus uniform jitter. Nothing is
//! seeded by default, so two calls never return the same numbers. Tests
//! pass their own [`Rng`] through the `*_with` variants.

use std::f64::consts::TAU;
use std::sync::Arc;

use rand::Rng;
use time::OffsetDateTime;

use super::alerts::{AlertInputs, derive_alerts};
use crate::api_client::types::{
    BatteryBlock, Connection, DeviceReading, HealthStatus, HistoryPoint, PowerBlock, SafetyBlock,
    StatusSnapshot, SystemBlock, TemperaturePoint,
};
use crate::site::{SiteConfig, SiteConfigProvider};
use crate::types::{HistoryWindow, format_rfc3339};

/// Points in every generated history series.
pub const HISTORY_POINTS: usize = 48;

const DEVICE_SOC_JITTER: f64 = 2.5;
const DEVICE_TEMPERATURE_JITTER: f64 = 1.0;
const DEVICE_VOLTAGE_JITTER: f64 = 5.0;
const DEVICE_WARNING_PROBABILITY: f64 = 0.02;

/// Much tighter than per-device jitter: the aggregate is smoothed by the
/// battery management system.
const SYSTEM_SOC_JITTER: f64 = 0.1;
const SYSTEM_TEMPERATURE_JITTER: f64 = 1.0;

const FIRE_ALARM_PROBABILITY: f64 = 0.0001;

const NOMINAL_EXECUTION_RATE: f64 = 99.0;

/// Largest magnitude of any power flow on a non-operational site (kW).
const IDLE_POWER_KW: f64 = 0.05;

/// Peak deviation of the daily charge cycle from the site's nominal SoC.
const DIURNAL_SOC_AMPLITUDE: f64 = 15.0;
const HISTORY_SOC_NOISE: f64 = 1.0;

/// Generates mock snapshots and history series.
#[derive(Clone)]
pub struct MockGenerator {
    sites: Arc<dyn SiteConfigProvider>,
}

impl MockGenerator {
    pub fn new(sites: Arc<dyn SiteConfigProvider>) -> Self {
        Self { sites }
    }

    pub fn sites(&self) -> &dyn SiteConfigProvider {
        self.sites.as_ref()
    }

    /// A fresh snapshot for `site_key`, timestamped now.
    pub fn generate_status(&self, site_key: &str) -> StatusSnapshot {
        self.generate_status_with(site_key, OffsetDateTime::now_utc(), &mut rand::thread_rng())
    }

    /// A fresh history series for `site_key`.
    ///
    /// Without bounds the series covers the last 24 hours.
    pub fn generate_history(
        &self,
        site_key: &str,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Vec<HistoryPoint> {
        let window = HistoryWindow::resolve(start, end, OffsetDateTime::now_utc());
        self.generate_history_with(site_key, window, &mut rand::thread_rng())
    }

    pub fn generate_status_with<R: Rng + ?Sized>(
        &self,
        site_key: &str,
        now: OffsetDateTime,
        rng: &mut R,
    ) -> StatusSnapshot {
        let site = self.sites.site(site_key);
        let devices = device_readings(site, rng);

        let soc = clamp_soc(jitter(rng, site.soc, SYSTEM_SOC_JITTER));
        let temperature_c = jitter(rng, site.temperature_c, SYSTEM_TEMPERATURE_JITTER);
        let fire_alarm = rng.gen_bool(FIRE_ALARM_PROBABILITY);

        let alerts = derive_alerts(
            site_key,
            AlertInputs {
                soc,
                temperature_c,
                fire_alarm,
                devices: &devices,
            },
            now,
        );

        let flows = PowerFlows::draw(site, rng);
        let pack_voltage = jitter(rng, site.voltage, 2.0);
        let (max_temp, min_temp) = temperature_extremes(&devices, temperature_c);

        StatusSnapshot {
            site_name: site.name.clone(),
            device_id: format!("{}-SIM", site.device_prefix),
            timestamp: format_rfc3339(now),
            system: SystemBlock {
                status: HealthStatus::from_alerts(&alerts),
                uptime: site.uptime.clone(),
                connection: Connection::Online,
                frequency: jitter(rng, site.frequency_hz, 0.02),
                bus_voltage: jitter(rng, site.bus_voltage, 2.0),
                real_power_kw: flows.real_kw,
                reactive_power_kvar: flows.reactive_kvar,
                execution_rate: flows.execution_rate,
                service_type: site.service_type,
            },
            battery: BatteryBlock {
                soc,
                soh: site.soh,
                voltage: pack_voltage,
                current: flows.real_kw * 1000.0 / pack_voltage,
                temp: temperature_c,
                max_temp,
                min_temp,
            },
            safety: SafetyBlock {
                fire_alarm,
                door_status: "closed".to_owned(),
                emergency_stop: false,
            },
            power: PowerBlock {
                pv_kw: flows.pv_kw,
                load_kw: flows.load_kw,
                grid_kw: flows.load_kw - flows.pv_kw - flows.real_kw,
                battery_kw: flows.real_kw,
            },
            devices,
            alerts,
        }
    }

    pub fn generate_history_with<R: Rng + ?Sized>(
        &self,
        site_key: &str,
        window: HistoryWindow,
        rng: &mut R,
    ) -> Vec<HistoryPoint> {
        let site = self.sites.site(site_key);

        window
            .sample_times(HISTORY_POINTS)
            .into_iter()
            .map(|t| {
                let soc = site.soc
                    + DIURNAL_SOC_AMPLITUDE * day_phase(t).sin()
                    + rng.gen_range(-HISTORY_SOC_NOISE..=HISTORY_SOC_NOISE);
                let (power, reactive_power, execution_rate) = if site.is_operational {
                    (
                        jitter(rng, site.real_power_kw, site.real_power_kw.abs() * 0.05),
                        jitter(rng, site.reactive_power_kvar, 5.0),
                        clamp_percent(jitter(rng, NOMINAL_EXECUTION_RATE, 1.0)),
                    )
                } else {
                    (idle_power(rng), idle_power(rng), 0.0)
                };

                HistoryPoint {
                    time: format_rfc3339(t),
                    soc: clamp_soc(soc),
                    power,
                    frequency: jitter(rng, site.frequency_hz, 0.05),
                    execution_rate,
                    reactive_power,
                }
            })
            .collect()
    }
}

/// Power figures drawn for one snapshot.
struct PowerFlows {
    real_kw: f64,
    reactive_kvar: f64,
    execution_rate: f64,
    pv_kw: f64,
    load_kw: f64,
}

impl PowerFlows {
    fn draw<R: Rng + ?Sized>(site: &SiteConfig, rng: &mut R) -> Self {
        if !site.is_operational {
            return Self {
                real_kw: idle_power(rng),
                reactive_kvar: idle_power(rng),
                execution_rate: 0.0,
                pv_kw: idle_power(rng).abs(),
                load_kw: idle_power(rng).abs(),
            };
        }

        Self {
            real_kw: jitter(rng, site.real_power_kw, 2.0),
            reactive_kvar: jitter(rng, site.reactive_power_kvar, 1.0),
            execution_rate: clamp_percent(jitter(rng, NOMINAL_EXECUTION_RATE, 1.0)),
            pv_kw: jitter(rng, site.pv_kw, 1.0).max(0.0),
            load_kw: jitter(rng, site.load_kw, 1.5).max(0.0),
        }
    }
}

fn device_readings<R: Rng + ?Sized>(site: &SiteConfig, rng: &mut R) -> Vec<DeviceReading> {
    (1..=site.device_count)
        .map(|index| {
            let name = format!("{}-{index:02}", site.device_prefix);
            let status = if rng.gen_bool(DEVICE_WARNING_PROBABILITY) {
                HealthStatus::Warning
            } else {
                HealthStatus::Normal
            };
            DeviceReading {
                id: name.to_ascii_lowercase(),
                name,
                status,
                soc: clamp_soc(jitter(rng, site.soc, DEVICE_SOC_JITTER)),
                temp: jitter(rng, site.temperature_c, DEVICE_TEMPERATURE_JITTER),
                voltage: jitter(rng, site.voltage, DEVICE_VOLTAGE_JITTER),
            }
        })
        .collect()
}

/// Hottest and coolest device, or the aggregate reading when there are no
/// devices to point at.
fn temperature_extremes(
    devices: &[DeviceReading],
    aggregate_c: f64,
) -> (TemperaturePoint, TemperaturePoint) {
    let point = |device: Option<&DeviceReading>| match device {
        Some(d) => TemperaturePoint {
            value: d.temp,
            position: d.name.clone(),
        },
        None => TemperaturePoint {
            value: aggregate_c,
            position: "N/A".to_owned(),
        },
    };

    let hottest = devices.iter().max_by(|a, b| a.temp.total_cmp(&b.temp));
    let coolest = devices.iter().min_by(|a, b| a.temp.total_cmp(&b.temp));
    (point(hottest), point(coolest))
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, base: f64, spread: f64) -> f64 {
    if spread <= 0.0 {
        return base;
    }
    base + rng.gen_range(-spread..=spread)
}

fn idle_power<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-IDLE_POWER_KW..=IDLE_POWER_KW)
}

fn clamp_soc(soc: f64) -> f64 {
    clamp_percent(soc)
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Position within the UTC day as an angle in `[0, TAU)`.
fn day_phase(t: OffsetDateTime) -> f64 {
    let seconds = t.unix_timestamp().rem_euclid(86_400);
    seconds as f64 / 86_400.0 * TAU
}
