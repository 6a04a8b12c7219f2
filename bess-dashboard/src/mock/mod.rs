//! Synthesized telemetry for sites without a reachable device API.

mod alerts;
mod generator;

pub use alerts::{AlertInputs, HIGH_TEMPERATURE_C, LOW_SOC_PERCENT, derive_alerts};
pub use generator::{HISTORY_POINTS, MockGenerator};
