//! The device API this service optionally proxies.
//!
//! [`check_endpoint`] decides whether the configured endpoint is worth
//! calling at all, [`UpstreamClient`] makes the single timeout-bounded
//! request, and [`mapping`] normalizes whatever comes back.

mod client;
pub mod mapping;
mod policy;

pub use client::{UpstreamClient, UpstreamError};
pub use policy::{Endpoint, PLACEHOLDER_API_KEYS, Unconfigured, check_endpoint, is_private_host};
