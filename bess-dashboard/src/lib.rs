//! Telemetry backend for battery energy storage (BESS) site dashboards.
//!
//! Serves status and history for a site, proxied from the device API when
//! one is configured and reachable, synthesized otherwise. See
//! [`resolver::TelemetryResolver`] for the sourcing policy.

pub mod api;
pub mod api_client;
pub mod config;
pub mod error;
pub mod mock;
pub mod resolver;
pub mod site;
pub mod tracing;
pub mod types;
pub mod upstream;
