use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::error::MetricsError;

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

pub(super) struct ScrapeError(MetricsError);

impl From<MetricsError> for ScrapeError {
    fn from(err: MetricsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "scrape failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

// ─── GET /metrics ────────────────────────────────────────────────

pub(super) async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ScrapeError> {
    let start = Instant::now();

    let snapshot = state.builder.build(Utc::now());
    state.sink.record(&snapshot)?;
    let body = state.sink.render()?;

    debug!(
        observations = snapshot.observations.len(),
        failures = snapshot.failures.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "scrape complete"
    );

    Ok(([(header::CONTENT_TYPE, state.sink.content_type())], body).into_response())
}

// ─── Fallback ────────────────────────────────────────────────────

pub(super) async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
