//! Web server for the earthquake map.
//!
//! Each page request performs one fresh fetch of the feed and renders the
//! map from it. Nothing is cached between requests.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tracing::{info, warn};

use crate::client::FeedSource;
use crate::errors::QuakemapError;
use crate::map::{MapAssembler, MapView};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Where each request loads the feed from
    source: Arc<dyn FeedSource>,
    /// Turns features into the page
    assembler: Arc<MapAssembler>,
}

impl AppState {
    #[must_use]
    pub fn new(source: Arc<dyn FeedSource>, assembler: MapAssembler) -> Self {
        Self {
            source,
            assembler: Arc::new(assembler),
        }
    }
}

/// A failed map request, reported to the client as plain text.
struct MapError {
    status: StatusCode,
    message: String,
}

impl From<QuakemapError> for MapError {
    fn from(e: QuakemapError) -> Self {
        warn!("map request failed: {e}");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for MapError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/map.json", get(view_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("map server starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Fetch the feed and assemble a view on the blocking pool.
async fn load_view(state: &AppState) -> Result<MapView, MapError> {
    let source = Arc::clone(&state.source);
    let assembler = Arc::clone(&state.assembler);

    let joined = tokio::task::spawn_blocking(move || -> Result<MapView, QuakemapError> {
        let feed = source.fetch()?;
        assembler.assemble(&feed.features)
    })
    .await;

    match joined {
        Ok(view) => Ok(view?),
        Err(e) => Err(MapError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("render task failed: {e}"),
        }),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the rendered map.
async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, MapError> {
    let view = load_view(&state).await?;
    let page = state.assembler.render_page(&view)?;
    info!("served map with {} markers", view.marker_count());
    Ok(Html(page))
}

/// The view description as JSON.
async fn view_handler(State(state): State<AppState>) -> Result<Json<MapView>, MapError> {
    Ok(Json(load_view(&state).await?))
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}
