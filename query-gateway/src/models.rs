//! HTTP request models for the gateway's public API.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use query_engine::{DataQuery, QueryDataRequest, TimeRange};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Request body for `POST /query`.
///
/// Every query shares the body's time range. Each query object is the JSON
/// saved by the editor and must carry a non-empty, unique `refId`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryBody {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub queries: Vec<serde_json::Value>,
}

impl QueryBody {
    pub fn into_request(self) -> Result<QueryDataRequest, ApiError> {
        if self.queries.is_empty() {
            return Err(ApiError::BadRequest(
                "at least one query must be present".to_string(),
            ));
        }

        let time_range = TimeRange::new(self.from, self.to);
        let mut seen = HashSet::with_capacity(self.queries.len());
        let mut queries = Vec::with_capacity(self.queries.len());

        for (index, json) in self.queries.into_iter().enumerate() {
            let ref_id = json
                .get("refId")
                .and_then(serde_json::Value::as_str)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| ApiError::BadRequest(format!("query {index} has no refId")))?
                .to_string();

            if !seen.insert(ref_id.clone()) {
                return Err(ApiError::BadRequest(format!("duplicate refId \"{ref_id}\"")));
            }

            queries.push(DataQuery {
                ref_id,
                time_range,
                json,
            });
        }

        Ok(QueryDataRequest { queries })
    }
}
