//! Dashboard API endpoints, mounted under `/api/ems`.
//!
//! The telemetry endpoints always answer 200 with the best data available;
//! an unreachable device API shows up as `system.connection = "offline"`,
//! never as an HTTP error.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use time::OffsetDateTime;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::server::SharedState;
use crate::api_client::types::{HistoryPoint, SiteSummary, StatusSnapshot};
use crate::tracing::prelude::*;
use crate::types::parse_rfc3339;

/// Site key used when the request names none. Not in the site table, so
/// it resolves to the generic configuration.
const DEFAULT_SITE_KEY: &str = "default";

/// Build the API routes with OpenAPI metadata.
pub fn routes() -> OpenApiRouter<SharedState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(get_sites))
        .routes(routes!(get_status))
        .routes(routes!(get_history))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Site key, e.g. `chiayi`. Unknown or missing keys get generic data.
    site: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Site key, e.g. `chiayi`.
    site: Option<String>,
    /// RFC 3339 start of the window. Defaults to 24 hours before `end`.
    start: Option<String>,
    /// RFC 3339 end of the window. Defaults to now.
    end: Option<String>,
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = OK, description = "Server is running", body = String),
    ),
)]
async fn health() -> &'static str {
    "OK"
}

/// List the configured sites.
#[utoipa::path(
    get,
    path = "/sites",
    tag = "sites",
    responses(
        (status = OK, description = "Known sites", body = Vec<SiteSummary>),
    ),
)]
async fn get_sites(State(state): State<SharedState>) -> Json<Vec<SiteSummary>> {
    let sites = state.resolver.sites();
    Json(
        sites
            .keys()
            .into_iter()
            .map(|key| SiteSummary {
                key: key.to_owned(),
                name: sites.site(key).name.clone(),
            })
            .collect(),
    )
}

/// Return the current telemetry snapshot for a site.
#[utoipa::path(
    get,
    path = "/status",
    tag = "telemetry",
    params(StatusQuery),
    responses(
        (status = OK, description = "Current site telemetry", body = StatusSnapshot),
    ),
)]
async fn get_status(
    State(state): State<SharedState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Json<StatusSnapshot> {
    let query = query_or_default(query);
    let site = site_key(query.site.as_deref());
    Json(state.resolver.get_status(&site).await)
}

/// Return the telemetry history of a site over a time window.
#[utoipa::path(
    get,
    path = "/history",
    tag = "telemetry",
    params(HistoryQuery),
    responses(
        (status = OK, description = "History series, oldest first", body = Vec<HistoryPoint>),
    ),
)]
async fn get_history(
    State(state): State<SharedState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Json<Vec<HistoryPoint>> {
    let query = query_or_default(query);
    let site = site_key(query.site.as_deref());
    let start = parse_bound("start", query.start.as_deref());
    let end = parse_bound("end", query.end.as_deref());
    Json(state.resolver.get_history(&site, start, end).await)
}

/// A query string that does not decode (repeated keys, bad encoding) is
/// treated as empty.
fn query_or_default<T: Default>(query: Result<Query<T>, QueryRejection>) -> T {
    match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Ignoring malformed query string");
            T::default()
        }
    }
}

fn site_key(raw: Option<&str>) -> String {
    raw.map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SITE_KEY.to_owned())
}

/// Unparsable bounds are dropped, as if not given.
fn parse_bound(name: &str, raw: Option<&str>) -> Option<OffsetDateTime> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    let parsed = parse_rfc3339(raw);
    if parsed.is_none() {
        warn!(param = name, value = raw, "Ignoring unparsable time bound");
    }
    parsed
}
