//! Error taxonomy for the metric query path.

use serde::Serializer;
use thiserror::Error;

/// Errors produced while translating, executing, or assembling metric queries.
///
/// `InvalidTimeRange`, `RemoteCallFailed` and `Cancelled` abort the whole
/// incoming call. Every other variant is attached to a single `refId`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid time range: start time must be before end time")]
    InvalidTimeRange,

    #[error("invalid period \"{0}\": expected seconds or \"auto\"")]
    InvalidPeriod(String),

    #[error("invalid query {ref_id}: {reason}")]
    InvalidQuery { ref_id: String, reason: String },

    #[error("query {ref_id} reuses id \"{id}\" already used in this request")]
    DuplicateQueryId { ref_id: String, id: String },

    #[error("malformed result: {0}")]
    MalformedResult(String),

    #[error("metric data request failed: {0:#}")]
    RemoteCallFailed(anyhow::Error),

    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    /// True for errors that fail every query of the call, not just one `refId`.
    pub fn is_call_level(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidTimeRange | QueryError::RemoteCallFailed(_) | QueryError::Cancelled
        )
    }
}

/// Serialize an error as its display message.
pub(crate) fn serialize_message<S: Serializer>(
    err: &Option<QueryError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn serialize_messages<S: Serializer>(
    errs: &[QueryError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errs.iter().map(|e| e.to_string()))
}
