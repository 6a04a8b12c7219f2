//! HTTP server wiring: router, OpenAPI document and shutdown.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use super::v0;
use crate::error::Result;
use crate::resolver::TelemetryResolver;
use crate::tracing::prelude::*;

/// State shared by all handlers.
#[derive(Clone)]
pub struct SharedState {
    pub resolver: Arc<TelemetryResolver>,
}

impl SharedState {
    pub fn new(resolver: TelemetryResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BESS Dashboard API",
        description = "Status and history telemetry for battery energy storage sites."
    ),
    tags(
        (name = "telemetry", description = "Site status and history"),
        (name = "sites", description = "Configured sites"),
        (name = "health", description = "Liveness"),
    )
)]
struct ApiDoc;

/// Build the full application router.
pub fn build_router(state: SharedState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/ems", v0::routes())
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: CancellationToken,
) -> Result<()> {
    let app = build_router(state);
    info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("API server stopped");
    Ok(())
}
