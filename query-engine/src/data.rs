//! Incoming call and response shapes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{self, QueryError};
use crate::frame::Frame;
use crate::time_range::TimeRange;

/// One query of an incoming call: its `refId`, window and raw JSON.
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub ref_id: String,
    pub time_range: TimeRange,
    pub json: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

/// Frames and the optional error for one `refId`.
#[derive(Debug, Default, Serialize)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    #[serde(
        serialize_with = "error::serialize_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<QueryError>,
}

impl DataResponse {
    pub fn failed(err: QueryError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(err),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct QueryDataResponse {
    /// Keyed by `refId`.
    pub results: BTreeMap<String, DataResponse>,
    /// Problems with the backend response that belong to no `refId`.
    #[serde(
        serialize_with = "error::serialize_messages",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub faults: Vec<QueryError>,
}

impl QueryDataResponse {
    pub fn frame_count(&self) -> usize {
        self.results.values().map(|r| r.frames.len()).sum()
    }
}
