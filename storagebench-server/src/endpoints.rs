//! Contains all HTTP endpoint handlers.
//!
//! Use [`routes`] to create a router with all endpoints.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use storagebench_service::{BenchmarkRequest, BenchmarkResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::ServiceState;

pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
}

async fn health() -> impl IntoResponse {
    "OK"
}

/// Runs one benchmark invocation for the request in the body.
///
/// Backend failures are part of a successful response. Only malformed requests and payload
/// generation failures are reported as error statuses.
async fn invoke(
    State(state): State<ServiceState>,
    request: Result<Json<BenchmarkRequest>, JsonRejection>,
) -> ApiResult<Json<BenchmarkResponse>> {
    let Json(request) = request.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    tracing::info!(event = ?request, "Received invocation");

    let report = state.runner.run(&request).await?;
    Ok(Json(report.into_response()))
}
