//! Decides where each request's telemetry comes from.
//!
//! For every request the resolver either proxies the device API or falls
//! back to the mock generator:
//!
//! | Upstream                      | status                  | history     |
//! |-------------------------------|-------------------------|-------------|
//! | unconfigured                  | mock                    | mock        |
//! | timeout / unreachable         | mock, `offline`         | mock        |
//! | HTTP error / undecodable body | mock, `offline`         | empty       |
//! | success                       | mapped payload          | mapped      |
//!
//! Callers always get data; failures only show up in logs and in
//! `system.connection`.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::api_client::types::{Connection, HistoryPoint, StatusSnapshot};
use crate::config::UpstreamConfig;
use crate::error::Result;
use crate::mock::MockGenerator;
use crate::site::SiteConfigProvider;
use crate::tracing::prelude::*;
use crate::types::HistoryWindow;
use crate::upstream::{UpstreamClient, UpstreamError, Unconfigured, check_endpoint, mapping};

/// Where a request for one site goes.
enum Source<'a> {
    Upstream {
        client: &'a UpstreamClient,
        device_id: &'a str,
    },
    Mock(Unconfigured),
}

pub struct TelemetryResolver {
    mock: MockGenerator,
    upstream: std::result::Result<UpstreamClient, Unconfigured>,
    config: UpstreamConfig,
}

impl TelemetryResolver {
    pub fn new(sites: Arc<dyn SiteConfigProvider>, config: &UpstreamConfig) -> Result<Self> {
        let upstream = match check_endpoint(config) {
            Ok(endpoint) => {
                let client = UpstreamClient::new(endpoint, config.timeout)?;
                info!(
                    url = client.base_url(),
                    timeout = ?client.timeout(),
                    "Device API configured"
                );
                Ok(client)
            }
            Err(reason) => {
                info!(%reason, "Device API not configured, serving mock telemetry");
                Err(reason)
            }
        };

        Ok(Self {
            mock: MockGenerator::new(sites),
            upstream,
            config: config.clone(),
        })
    }

    pub fn sites(&self) -> &dyn SiteConfigProvider {
        self.mock.sites()
    }

    fn source(&self, site_key: &str) -> Source<'_> {
        let client = match &self.upstream {
            Ok(client) => client,
            Err(reason) => return Source::Mock(reason.clone()),
        };
        match self.config.device_id(site_key) {
            Some(device_id) => Source::Upstream { client, device_id },
            None => Source::Mock(Unconfigured::MissingDeviceId(site_key.to_owned())),
        }
    }

    /// Current snapshot for `site_key`.
    pub async fn get_status(&self, site_key: &str) -> StatusSnapshot {
        let (client, device_id) = match self.source(site_key) {
            Source::Upstream { client, device_id } => (client, device_id),
            Source::Mock(reason) => {
                info!(site = site_key, %reason, "Serving mock status");
                return self.mock.generate_status(site_key);
            }
        };

        match client.fetch_status(device_id).await {
            Ok(payload) => mapping::map_status(
                site_key,
                self.sites().site(site_key),
                device_id,
                &payload,
                OffsetDateTime::now_utc(),
            ),
            Err(e) => {
                log_failure(site_key, device_id, "status", &e);
                let mut snapshot = self.mock.generate_status(site_key);
                snapshot.device_id = device_id.to_owned();
                snapshot.system.connection = Connection::Offline;
                snapshot
            }
        }
    }

    /// History for `site_key` over the given bounds (default: last 24h).
    pub async fn get_history(
        &self,
        site_key: &str,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Vec<HistoryPoint> {
        let window = HistoryWindow::resolve(start, end, OffsetDateTime::now_utc());

        let (client, device_id) = match self.source(site_key) {
            Source::Upstream { client, device_id } => (client, device_id),
            Source::Mock(reason) => {
                info!(site = site_key, %reason, "Serving mock history");
                return self.mock_history(site_key, window);
            }
        };

        match client.fetch_history(device_id, window).await {
            Ok(payload) => mapping::map_history(&payload),
            Err(e) => {
                log_failure(site_key, device_id, "history", &e);
                if e.is_transient() {
                    self.mock_history(site_key, window)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn mock_history(&self, site_key: &str, window: HistoryWindow) -> Vec<HistoryPoint> {
        self.mock
            .generate_history(site_key, Some(window.start), Some(window.end))
    }
}

fn log_failure(site_key: &str, device_id: &str, what: &str, e: &UpstreamError) {
    match e {
        UpstreamError::Timeout(_) | UpstreamError::Unreachable(_) => {
            warn!(site = site_key, device_id, error = %e, "Device API {what} request failed, using mock data");
        }
        UpstreamError::Status(code) => {
            error!(site = site_key, device_id, status = code, "Device API {what} request rejected");
        }
        UpstreamError::Decode(_) => {
            error!(site = site_key, device_id, error = %e, "Device API {what} response unusable");
        }
    }
}
