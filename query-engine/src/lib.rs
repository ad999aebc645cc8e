//! Translation of time-series metric queries into batched `GetMetricData`
//! exchanges, and of the results back into named frames.
//!
//! An incoming call flows through:
//! time range validation → [`query::normalize`] → [`alias::migrate_alias`]
//! → [`request::build_metric_data_query`] → [`executor::Executor`]
//! (batched, paginated) → [`naming::frame_name`] + [`frame::build_frame`].

pub mod alias;
pub mod client;
pub mod data;
pub mod error;
pub mod executor;
pub mod frame;
pub mod naming;
pub mod period;
pub mod query;
pub mod request;
pub mod time_range;

pub use client::{FakeMetricDataClient, HttpMetricDataClient, MetricDataClient};
pub use data::{DataQuery, DataResponse, QueryDataRequest, QueryDataResponse};
pub use error::QueryError;
pub use executor::{Executor, ExecutorConfig};
pub use frame::Frame;
pub use time_range::TimeRange;
