//! HTTP surface: the traversal endpoint, the one-hop convenience endpoint,
//! and a health check. Everything interesting happens in the traversal
//! module; handlers validate, dispatch onto a blocking DB task, and map
//! errors onto status codes.

pub mod audit;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Db;
use crate::error::{LineageError, Result};
use crate::graph::SqliteGraphStore;
use crate::taxonomy::TaxonomyRegistry;
use crate::traversal::{
    one_hop, CancelFlag, HopCollapser, OneHopRequest, TraversalEngine, TraverseRequest,
};

/// HTTP server wrapping the traversal engine.
pub struct HttpServer {
    state: AppState,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    db: Arc<Db>,
    registry: Arc<TaxonomyRegistry>,
    config: Config,
}

impl HttpServer {
    pub fn new(db: Db, registry: TaxonomyRegistry, config: Config) -> Self {
        Self {
            state: AppState {
                db: Arc::new(db),
                registry: Arc::new(registry),
                config,
            },
        }
    }

    /// Run the HTTP server until the process exits.
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.create_router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting lineage HTTP server on http://{}", addr);
        log::info!("Traversal endpoint: http://{}/api/lineage/traverse", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| LineageError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("Failed to bind to {}: {}", addr, e),
            )))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| LineageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            )))?;

        Ok(())
    }

    /// Create the axum router
    fn create_router(&self) -> Router {
        let allowed_origins = &self.state.config.http_server.allowed_origins;

        // No configured origins means local development: allow all.
        let cors = if allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/lineage/traverse", post(handle_traverse))
            .route("/api/lineage/one-hop", post(handle_one_hop))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

/// Handle POST /api/lineage/traverse
async fn handle_traverse(
    State(state): State<AppState>,
    Json(request): Json<TraverseRequest>,
) -> Response {
    let started = Instant::now();

    let params = match request.validate(&state.config.traversal) {
        Ok(params) => params,
        Err(e) => return error_response(&e),
    };

    let registry = Arc::clone(&state.registry);
    let engine_params = params.clone();
    let result = state
        .db
        .with_connection(move |conn| {
            let store = SqliteGraphStore::new(conn);
            let engine = TraversalEngine::new(&registry);
            let raw = engine.traverse(&store, &engine_params, &CancelFlag::new())?;
            HopCollapser::new(&registry).collapse(&raw, engine_params.include_transformers)
        })
        .await;

    let duration_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(response) => {
            audit::log_query(
                &state.db,
                &params,
                response.nodes.len(),
                duration_ms,
                true,
                None,
            )
            .await;
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            audit::log_query(&state.db, &params, 0, duration_ms, false, Some(&e.to_string()))
                .await;
            error_response(&e)
        }
    }
}

/// Handle POST /api/lineage/one-hop
async fn handle_one_hop(
    State(state): State<AppState>,
    Json(request): Json<OneHopRequest>,
) -> Response {
    let params = match request.validate(&state.config.traversal) {
        Ok(params) => params,
        Err(e) => return error_response(&e),
    };

    let registry = Arc::clone(&state.registry);
    let result = state
        .db
        .with_connection(move |conn| {
            let store = SqliteGraphStore::new(conn);
            one_hop(&registry, &store, &params)
        })
        .await;

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handle health check endpoint
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "lineagegraph",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

/// Map error kinds onto status codes and a uniform error body.
fn error_response(err: &LineageError) -> Response {
    let (status, kind) = match err {
        LineageError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        LineageError::StartNotFound(_) => (StatusCode::NOT_FOUND, "start_not_found"),
        LineageError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
        LineageError::Taxonomy(_) => (StatusCode::INTERNAL_SERVER_ERROR, "taxonomy_error"),
        LineageError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        LineageError::Database(_) | LineageError::Io(_) | LineageError::Store(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "adapter_error")
        }
    };

    if status.is_server_error() {
        log::error!("request failed: {}", err);
    }

    (
        status,
        Json(serde_json::json!({
            "error": kind,
            "message": err.to_string()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (LineageError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (LineageError::StartNotFound("x".into()), StatusCode::NOT_FOUND),
            (LineageError::Cancelled, StatusCode::REQUEST_TIMEOUT),
            (LineageError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = error_response(&err);
            assert_eq!(response.status(), expected, "for {:?}", err);
        }
    }
}
