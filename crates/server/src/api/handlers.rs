//! HTTP request handlers and application state.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use retrieval_core::config;
use retrieval_core::{Index, SearchRequest};
use std::sync::Arc;
use std::time::Instant;

use super::errors::ApiError;
use super::metrics;
use super::models::{HealthResponse, NeighborDto, SearchBody, SearchResult};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<Index>,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

fn validate_query(query: &[f32]) -> Result<(), ApiError> {
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(ApiError::BadRequest("query contains NaN or Inf".into()));
    }
    Ok(())
}

/// `POST /search`
pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResult>, ApiError> {
    if body.top_k == 0 || body.top_k > config::MAX_TOP_K {
        return Err(ApiError::BadRequest(format!(
            "top_k must be 1-{}",
            config::MAX_TOP_K
        )));
    }
    validate_query(&body.query)?;

    let top_k = body.top_k;
    let request = SearchRequest::new(body.query)
        .with_top_k(top_k)
        .with_labels(body.labels);
    let index = Arc::clone(&state.index);

    let start = Instant::now();
    let response = tokio::task::spawn_blocking(move || index.search(&request))
        .await
        .map_err(|e| {
            tracing::error!("search task join failed: {}", e);
            ApiError::Internal("Internal error".into())
        })??;
    let elapsed = start.elapsed();

    metrics::record_search(state.index.kind().as_str(), elapsed);
    let search_cost_ms = elapsed.as_secs_f64() * 1000.0;
    tracing::info!(
        top_k,
        returned = response.neighbors.len(),
        elapsed_ms = search_cost_ms,
        "search completed"
    );

    Ok(Json(SearchResult {
        neighbors: response.neighbors.into_iter().map(NeighborDto::from).collect(),
        search_cost_ms,
        total_count: response.total_count,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = if state.index.is_serving() {
        "ok"
    } else {
        "building"
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_type: state.index.kind().to_string(),
        dimension: state.index.dimension(),
        total_count: state.index.total_count(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };
    (StatusCode::OK, Json(body))
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    metrics::set_records_total(state.index.total_count());
    state.prometheus_handle.render()
}
