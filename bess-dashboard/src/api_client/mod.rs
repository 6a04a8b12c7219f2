//! Client for the dashboard API.

pub mod types;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::types::format_rfc3339;
use types::{HistoryPoint, SiteSummary, StatusSnapshot};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7786";

/// HTTP client for the `/api/ems` endpoints.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_owned())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub async fn get_sites(&self) -> Result<Vec<SiteSummary>> {
        self.get("sites", &[]).await
    }

    pub async fn get_status(&self, site: &str) -> Result<StatusSnapshot> {
        self.get("status", &[("site", site.to_owned())]).await
    }

    pub async fn get_history(
        &self,
        site: &str,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<HistoryPoint>> {
        let mut query = vec![("site", site.to_owned())];
        query.extend(start.map(|t| ("start", format_rfc3339(t))));
        query.extend(end.map(|t| ("end", format_rfc3339(t))));
        self.get("history", &query).await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/api/ems/{path}", self.base_url);
        self.http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("decoding response from {url}"))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn fetches_status_for_site() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ems/status")
            .match_query(Matcher::UrlEncoded("site".into(), "chiayi".into()))
            .with_status(200)
            .with_body(
                serde_json::to_string(&StatusSnapshot {
                    site_name: "Chiayi BESS".to_owned(),
                    ..Default::default()
                })
                .unwrap(),
            )
            .create_async()
            .await;

        let client = Client::with_base_url(format!("{}/", server.url()));
        let status = client.get_status("chiayi").await.unwrap();

        assert_eq!(status.site_name, "Chiayi BESS");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/ems/history")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let client = Client::with_base_url(server.url());
        assert!(client.get_history("chiayi", None, None).await.is_err());
    }

    #[tokio::test]
    async fn lists_sites() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/ems/sites")
            .with_status(200)
            .with_body(json!([{"key": "chiayi", "name": "Chiayi BESS"}]).to_string())
            .create_async()
            .await;

        let client = Client::with_base_url(server.url());
        let sites = client.get_sites().await.unwrap();
        assert_eq!(sites[0].key, "chiayi");
    }
}
