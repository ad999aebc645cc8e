//! Output frames built from remote result entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::{MetricDataResult, StatusCode};
use crate::error::QueryError;
use crate::naming;
use crate::query::MetricQuery;

/// One named time series in the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub name: String,
    pub ref_id: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
    pub status: StatusCode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

/// Assemble the frame for `result`, which was correlated to `query`.
pub fn build_frame(query: &MetricQuery, result: &MetricDataResult) -> Result<Frame, QueryError> {
    if result.values.len() != result.timestamps.len() {
        return Err(QueryError::MalformedResult(format!(
            "query {} received {} values but {} timestamps",
            query.ref_id,
            result.values.len(),
            result.timestamps.len()
        )));
    }

    let mut notices: Vec<String> = result
        .messages
        .iter()
        .map(|m| format!("{}: {}", m.code, m.value))
        .collect();
    if result.status_code != StatusCode::Complete {
        notices.push(format!(
            "partial result: backend reported status {}",
            result.status_code
        ));
    }

    Ok(Frame {
        name: naming::frame_name(query, result),
        ref_id: query.ref_id.clone(),
        timestamps: result.timestamps.clone(),
        values: result.values.clone(),
        status: result.status_code,
        notices,
    })
}
