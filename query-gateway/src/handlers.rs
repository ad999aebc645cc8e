//! Axum HTTP handlers for the query gateway.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use query_engine::QueryDataResponse;
use tracing::{error, info};

use crate::{error::ApiError, models::QueryBody, AppState};

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /query
///
/// Runs every query of the body as one call. The call is cancelled when the
/// gateway shuts down or the client goes away.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryDataResponse>, ApiError> {
    let request = body.into_request()?;
    let cancel = state.shutdown.child_token();

    match state.executor.query_data(&request, &cancel).await {
        Ok(response) => {
            info!(
                queries = request.queries.len(),
                frames = response.frame_count(),
                "POST /query processed"
            );
            Ok(Json(response))
        }
        Err(e) => {
            error!(
                error = %e,
                call_level = e.is_call_level(),
                queries = request.queries.len(),
                "POST /query failed"
            );
            Err(e.into())
        }
    }
}
