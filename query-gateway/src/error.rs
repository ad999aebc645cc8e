use axum::{http::StatusCode, response::IntoResponse, Json};
use query_engine::QueryError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::InvalidTimeRange) => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::RemoteCallFailed(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Query(QueryError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
