//! HTTP client for the device API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use super::policy::Endpoint;
use crate::error::{Error, Result};
use crate::tracing::prelude::*;
use crate::types::{HistoryWindow, format_rfc3339};

/// Failure of a single upstream request.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No complete response within the bound; the request was dropped.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Connection-level failure (refused, DNS, TLS).
    #[error("unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The device API answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The device API answered 2xx but the body was not JSON.
    #[error("undecodable response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Timeouts and connection failures. The upstream might be fine a
    /// moment later; nothing was learned about its data.
    pub fn is_transient(&self) -> bool {
        matches!(self, UpstreamError::Timeout(_) | UpstreamError::Unreachable(_))
    }
}

/// Device API client.
///
/// Every request is a single attempt: no retries, bounded by `timeout`
/// covering connect, headers and body.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&endpoint.base_url)
            .map_err(|e| Error::Config(format!("device API URL {}: {e}", endpoint.base_url)))?;
        let http = Client::builder()
            .user_agent(concat!("bess-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: endpoint.api_key,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/devices/{device_id}/{leaf}`, with `device_id` as a single
    /// percent-encoded path segment.
    fn device_url(&self, device_id: &str, leaf: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["devices", device_id, leaf]);
        }
        url
    }

    /// `GET {base}/devices/{device_id}/status`
    pub async fn fetch_status(&self, device_id: &str) -> std::result::Result<Value, UpstreamError> {
        let url = self.device_url(device_id, "status");
        self.get_json(url, &[]).await
    }

    /// `GET {base}/devices/{device_id}/history?start=..&end=..`
    pub async fn fetch_history(
        &self,
        device_id: &str,
        window: HistoryWindow,
    ) -> std::result::Result<Value, UpstreamError> {
        let url = self.device_url(device_id, "history");
        let query = [
            ("start", format_rfc3339(window.start)),
            ("end", format_rfc3339(window.end)),
        ];
        self.get_json(url, &query).await
    }

    async fn get_json(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> std::result::Result<Value, UpstreamError> {
        debug!(%url, "Upstream request");

        let request = async {
            let response = self
                .http
                .get(url)
                .bearer_auth(&self.api_key)
                .query(query)
                .send()
                .await
                .map_err(|e| classify_send_error(e, self.timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status(status.as_u16()));
            }

            response.json::<Value>().await.map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.timeout)
                } else {
                    UpstreamError::Decode(e)
                }
            })
        };

        // Dropping the request future on expiry aborts the connection.
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.timeout)),
        }
    }
}

fn classify_send_error(e: reqwest::Error, timeout: Duration) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(timeout)
    } else {
        UpstreamError::Unreachable(e)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;
    use time::macros::datetime;
    use tokio::net::TcpListener;

    use super::*;

    fn client(base_url: String, timeout: Duration) -> UpstreamClient {
        let endpoint = Endpoint {
            base_url,
            api_key: "test_token".to_owned(),
        };
        UpstreamClient::new(endpoint, timeout).unwrap()
    }

    #[tokio::test]
    async fn fetches_status_with_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/devices/CY-0001/status")
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"soc": 71.5}).to_string())
            .create_async()
            .await;

        let client = client(server.url(), Duration::from_secs(5));
        let payload = client.fetch_status("CY-0001").await.unwrap();

        assert_eq!(payload["soc"], 71.5);
        mock.assert_async().await;
    }

    #[test]
    fn device_id_is_a_single_path_segment() {
        let client = client("https://ems.example.com/api".to_owned(), Duration::from_secs(5));
        assert_eq!(
            client.device_url("CY/01?x#y", "status").as_str(),
            "https://ems.example.com/api/devices/CY%2F01%3Fx%23y/status"
        );

        let client = self::client("https://ems.example.com".to_owned(), Duration::from_secs(5));
        assert_eq!(
            client.device_url("CY-0001", "history").as_str(),
            "https://ems.example.com/devices/CY-0001/history"
        );
    }

    #[tokio::test]
    async fn history_passes_window_as_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/devices/CY-0001/history")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "2026-10-17T12:00:00Z".into()),
                Matcher::UrlEncoded("end".into(), "2026-10-18T12:00:00Z".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client(server.url(), Duration::from_secs(5));
        let window = HistoryWindow::trailing(datetime!(2026-10-18 12:00 UTC));
        let payload = client.fetch_history("CY-0001", window).await.unwrap();

        assert_eq!(payload, json!([]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/devices/CY-0001/status")
            .with_status(500)
            .create_async()
            .await;

        let client = client(server.url(), Duration::from_secs(5));
        let err = client.fetch_status("CY-0001").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Status(500)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/devices/CY-0001/status")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = client(server.url(), Duration::from_secs(5));
        let err = client.fetch_status("CY-0001").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn silent_upstream_times_out() {
        // Accepts connections but never writes a response.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(200);
        let client = client(format!("http://{addr}"), timeout);

        let started = std::time::Instant::now();
        let err = client.fetch_status("CY-0001").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Timeout(_)));
        assert!(err.is_transient());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let client = client(format!("http://{addr}"), Duration::from_secs(5));
        let err = client.fetch_status("CY-0001").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Unreachable(_)));
        assert!(err.is_transient());
    }
}
