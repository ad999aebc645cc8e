//! Batch execution of one incoming call against the metrics backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::pin::pin;
use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{
    GetMetricDataInput, GetMetricDataOutput, MetricDataClient, MetricDataResult, ScanBy,
};
use crate::data::{DataResponse, QueryDataRequest, QueryDataResponse};
use crate::error::QueryError;
use crate::frame;
use crate::period::{PeriodResolver, RetentionPeriodResolver};
use crate::query::{self, MetricQuery, NormalizeContext};
use crate::request;
use crate::time_range::TimeRange;

/// Backend limit on entries in a single `GetMetricData` call.
pub const MAX_QUERIES_PER_CALL: usize = 500;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Region used when a query says `"default"` or nothing.
    pub default_region: String,
    pub max_queries_per_call: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_string(),
            max_queries_per_call: MAX_QUERIES_PER_CALL,
        }
    }
}

/// Queries sent together in one paginated exchange, and what came back.
struct Exchange<'q> {
    sent: Vec<&'q MetricQuery>,
    results: Vec<MetricDataResult>,
}

// ------------------------------------------------------------------ //
//  Executor                                                           //
// ------------------------------------------------------------------ //

/// Runs incoming calls. Holds only read-only state and is shared across calls.
pub struct Executor {
    client: Arc<dyn MetricDataClient>,
    period_resolver: Arc<dyn PeriodResolver>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(client: Arc<dyn MetricDataClient>, config: ExecutorConfig) -> Self {
        Self {
            client,
            period_resolver: Arc::new(RetentionPeriodResolver),
            config,
        }
    }

    pub fn with_period_resolver(mut self, resolver: Arc<dyn PeriodResolver>) -> Self {
        self.period_resolver = resolver;
        self
    }

    /// Execute every query of one call.
    ///
    /// Fails as a whole on an invalid time range, a failed remote exchange,
    /// or cancellation. Any other problem is reported under its `refId`.
    pub async fn query_data(
        &self,
        req: &QueryDataRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryDataResponse, QueryError> {
        for q in &req.queries {
            q.time_range.validate()?;
        }

        let mut response = QueryDataResponse::default();
        let queries = self.normalize_all(req, &mut response);

        let exchanges = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(queries = queries.len(), "query_data cancelled");
                return Err(QueryError::Cancelled);
            }
            fetched = self.fetch_all(&queries) => fetched?,
        };

        let exchange_count = exchanges.len();
        for exchange in exchanges {
            correlate(exchange, &mut response);
        }

        info!(
            queries = req.queries.len(),
            exchanges = exchange_count,
            frames = response.frame_count(),
            faults = response.faults.len(),
            "query_data complete"
        );
        Ok(response)
    }

    fn normalize_all(
        &self,
        req: &QueryDataRequest,
        response: &mut QueryDataResponse,
    ) -> Vec<MetricQuery> {
        let reserved: HashSet<String> = req
            .queries
            .iter()
            .filter_map(|dq| query::explicit_id(&dq.json))
            .map(str::to_string)
            .collect();
        let ctx = NormalizeContext {
            default_region: &self.config.default_region,
            period_resolver: self.period_resolver.as_ref(),
            reserved_ids: &reserved,
        };
        let mut seen_ids = HashSet::with_capacity(req.queries.len());
        let mut queries = Vec::with_capacity(req.queries.len());

        for dq in &req.queries {
            let normalized = query::normalize(&dq.ref_id, dq.time_range, &dq.json, &ctx)
                .and_then(|q| {
                    if seen_ids.insert(q.id.clone()) {
                        Ok(q)
                    } else {
                        Err(QueryError::DuplicateQueryId {
                            ref_id: q.ref_id,
                            id: q.id,
                        })
                    }
                });

            match normalized {
                Ok(q) => {
                    response
                        .results
                        .insert(q.ref_id.clone(), DataResponse::default());
                    queries.push(q);
                }
                Err(e) => {
                    warn!(ref_id = %dq.ref_id, error = %e, "query rejected");
                    response
                        .results
                        .insert(dq.ref_id.clone(), DataResponse::failed(e));
                }
            }
        }

        queries
    }

    /// One exchange per (region, window) chunk; all succeed or the call fails.
    async fn fetch_all<'q>(
        &self,
        queries: &'q [MetricQuery],
    ) -> Result<Vec<Exchange<'q>>, QueryError> {
        let mut groups: BTreeMap<(&str, TimeRange), Vec<&MetricQuery>> = BTreeMap::new();
        for q in queries {
            groups
                .entry((q.region.as_str(), q.time_range))
                .or_default()
                .push(q);
        }

        let chunk_size = self.config.max_queries_per_call.max(1);
        let mut exchanges = Vec::new();

        for ((region, range), group) in groups {
            for chunk in group.chunks(chunk_size) {
                let input = GetMetricDataInput {
                    region: region.to_string(),
                    start_time: range.from,
                    end_time: range.to,
                    metric_data_queries: chunk
                        .iter()
                        .map(|q| request::build_metric_data_query(q))
                        .collect(),
                    scan_by: ScanBy::TimestampAscending,
                    next_token: None,
                };
                let results = self.collect_pages(input).await?;
                exchanges.push(Exchange {
                    sent: chunk.to_vec(),
                    results,
                });
            }
        }

        Ok(exchanges)
    }

    /// Follow continuation tokens until exhausted, merging split series.
    async fn collect_pages(
        &self,
        input: GetMetricDataInput,
    ) -> Result<Vec<MetricDataResult>, QueryError> {
        let region = input.region.clone();
        let mut pages = pin!(self.pages(input));
        let mut merged = Vec::new();
        let mut index = HashMap::new();
        let mut page_count = 0usize;

        while let Some(page) = pages.try_next().await? {
            page_count += 1;
            for message in &page.messages {
                warn!(
                    region = %region,
                    code = %message.code,
                    value = %message.value,
                    "backend message"
                );
            }
            merge_page(&mut merged, &mut index, page.metric_data_results);
        }

        debug!(region = %region, pages = page_count, results = merged.len(), "exchange complete");
        Ok(merged)
    }

    /// Lazily request pages; each token gates the next request.
    fn pages(
        &self,
        input: GetMetricDataInput,
    ) -> impl Stream<Item = Result<GetMetricDataOutput, QueryError>> + '_ {
        stream::try_unfold(Some(input), move |next| async move {
            let Some(input) = next else {
                return Ok::<_, QueryError>(None);
            };
            let output = self
                .client
                .get_metric_data(&input)
                .await
                .map_err(QueryError::RemoteCallFailed)?;
            let following = output.next_token.clone().map(|token| GetMetricDataInput {
                next_token: Some(token),
                ..input
            });
            Ok(Some((output, following)))
        })
    }
}

// ------------------------------------------------------------------ //
//  Result handling                                                    //
// ------------------------------------------------------------------ //

/// Append a page, joining entries split across pages by (id, label).
fn merge_page(
    merged: &mut Vec<MetricDataResult>,
    index: &mut HashMap<(String, Option<String>), usize>,
    page: Vec<MetricDataResult>,
) {
    for result in page {
        let key = (result.id.clone(), result.label.clone());
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.values.extend(result.values);
                existing.timestamps.extend(result.timestamps);
                existing.messages.extend(result.messages);
                existing.status_code = result.status_code;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(result);
            }
        }
    }
}

/// Match results to the queries of their exchange strictly by id.
fn correlate(exchange: Exchange<'_>, response: &mut QueryDataResponse) {
    let by_id: HashMap<&str, &MetricQuery> = exchange
        .sent
        .iter()
        .map(|q| (q.id.as_str(), *q))
        .collect();

    for result in &exchange.results {
        let Some(query) = by_id.get(result.id.as_str()) else {
            warn!(result_id = %result.id, "result entry does not match any sent query");
            response.faults.push(QueryError::MalformedResult(
                "result entry does not match any query in the request".to_string(),
            ));
            continue;
        };

        let entry = response.results.entry(query.ref_id.clone()).or_default();
        match frame::build_frame(query, result) {
            Ok(f) => entry.frames.push(f),
            Err(e) => {
                warn!(ref_id = %query.ref_id, error = %e, "dropping malformed result");
                if entry.error.is_none() {
                    entry.error = Some(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FakeMetricDataClient, MessageData, StatusCode};
    use crate::data::DataQuery;
    use crate::period::FixedPeriodResolver;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
        )
    }

    fn executor(fake: &FakeMetricDataClient) -> Executor {
        Executor::new(Arc::new(fake.clone()), ExecutorConfig::default())
            .with_period_resolver(Arc::new(FixedPeriodResolver(60)))
    }

    fn data_query(ref_id: &str, json: serde_json::Value) -> DataQuery {
        DataQuery {
            ref_id: ref_id.to_string(),
            time_range: range(),
            json,
        }
    }

    fn request(queries: Vec<DataQuery>) -> QueryDataRequest {
        QueryDataRequest { queries }
    }

    fn result(id: &str, label: &str) -> MetricDataResult {
        MetricDataResult {
            id: id.to_string(),
            label: Some(label.to_string()),
            values: vec![1.0],
            timestamps: vec![DateTime::<Utc>::UNIX_EPOCH],
            status_code: StatusCode::Complete,
            messages: vec![],
        }
    }

    fn page(results: Vec<MetricDataResult>, next_token: Option<&str>) -> GetMetricDataOutput {
        GetMetricDataOutput {
            metric_data_results: results,
            next_token: next_token.map(str::to_string),
            messages: vec![],
        }
    }

    fn builder_query(id: &str, metric: &str) -> serde_json::Value {
        json!({
            "type": "timeSeriesQuery",
            "namespace": "AWS/EC2",
            "metricName": metric,
            "expression": "",
            "dimensions": { "InstanceId": "i-00645d91ed77d87ac" },
            "region": "us-east-2",
            "id": id,
            "statistics": ["Maximum"],
            "period": "300",
            "matchExact": true
        })
    }

    fn frame_name(resp: &QueryDataResponse, ref_id: &str) -> String {
        resp.results[ref_id].frames[0].name.clone()
    }

    #[tokio::test]
    async fn sibling_queries_keep_their_own_names() {
        let fake = FakeMetricDataClient::with_pages([page(
            vec![result("a", "NetworkOut"), result("b", "NetworkIn")],
            None,
        )]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![
                    data_query("A", builder_query("a", "NetworkOut")),
                    data_query("B", builder_query("b", "NetworkIn")),
                ]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(frame_name(&resp, "A"), "NetworkOut");
        assert_eq!(frame_name(&resp, "B"), "NetworkIn");
        assert_eq!(resp.results["A"].frames[0].ref_id, "A");

        let calls = fake.snapshot();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].metric_data_queries.len(), 2);
        assert_eq!(calls[0].region, "us-east-2");
    }

    #[tokio::test]
    async fn inverted_range_fails_whole_call_before_sending() {
        let fake = FakeMetricDataClient::new();
        let now = Utc::now();
        let mut bad = data_query("B", json!({}));
        bad.time_range = TimeRange::new(now - Duration::hours(1), now - Duration::hours(2));

        let err = executor(&fake)
            .query_data(
                &request(vec![data_query("A", json!({})), bad]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid time range: start time must be before end time"
        );
        assert!(fake.snapshot().is_empty());
    }

    #[tokio::test]
    async fn equal_start_and_end_fails() {
        let fake = FakeMetricDataClient::new();
        let now = Utc::now();
        let mut q = data_query("A", json!({}));
        q.time_range = TimeRange::new(now, now);

        let err = executor(&fake)
            .query_data(&request(vec![q]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidTimeRange));
    }

    #[tokio::test]
    async fn legacy_and_current_alias_reach_backend_identically() {
        for alias in [
            "{{ period  }} some words {{   InstanceId }}",
            "${PROP('Period')} some words ${PROP('Dim.InstanceId')}",
        ] {
            let fake = FakeMetricDataClient::new();
            let mut json = builder_query("a", "NetworkOut");
            json["alias"] = json!(alias);

            executor(&fake)
                .query_data(&request(vec![data_query("A", json)]), &CancellationToken::new())
                .await
                .unwrap();

            let calls = fake.snapshot();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].metric_data_queries.len(), 1);
            assert_eq!(
                calls[0].metric_data_queries[0].label.as_deref(),
                Some("${PROP('Period')} some words ${PROP('Dim.InstanceId')}")
            );
        }
    }

    fn naming_query(params: serde_json::Value) -> serde_json::Value {
        let mut base = json!({
            "type": "timeSeriesQuery",
            "region": "us-east-2",
            "id": "query id",
            "refId": "A"
        });
        for (k, v) in params.as_object().unwrap() {
            base[k] = v.clone();
        }
        base
    }

    async fn name_for(params: serde_json::Value) -> String {
        let fake =
            FakeMetricDataClient::with_pages([page(vec![result("query id", "some label")], None)]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![data_query("A", naming_query(params))]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        frame_name(&resp, "A")
    }

    #[tokio::test]
    async fn raw_search_without_alias_is_named_after_id() {
        let name = name_for(json!({ "metricQueryType": 0, "metricEditorMode": 1 })).await;
        assert_eq!(name, "query id");
    }

    #[tokio::test]
    async fn query_mode_without_alias_uses_label() {
        let name = name_for(json!({
            "metricQueryType": 1,
            "dimensions": { "InstanceId": ["a", "b"] },
            "matchExact": true
        }))
        .await;
        assert_eq!(name, "some label");
    }

    #[tokio::test]
    async fn builder_cases_returning_label() {
        for params in [
            json!({ "dimensions": { "InstanceId": ["some-instance"] }, "matchExact": false }),
            json!({ "dimensions": { "InstanceId": ["*"] }, "matchExact": false }),
            json!({ "dimensions": { "InstanceId": ["*"] }, "matchExact": true }),
            json!({ "dimensions": {}, "matchExact": false }),
            json!({ "dimensions": { "InstanceId": ["some-instance"] }, "matchExact": true }),
            json!({ "dimensions": {}, "matchExact": true }),
            json!({
                "dimensions": { "InstanceId": ["some-instance", "another-instance"] },
                "matchExact": false
            }),
        ] {
            assert_eq!(name_for(params.clone()).await, "some label", "{params}");
        }
    }

    #[tokio::test]
    async fn multivalued_exact_builder_is_metric_stat() {
        let name = name_for(json!({
            "dimensions": { "InstanceId": ["a", "b"] },
            "matchExact": true,
            "metricName": "CPUUtilization",
            "statistic": "Maximum"
        }))
        .await;
        assert_eq!(name, "CPUUtilization_Maximum");
    }

    #[tokio::test]
    async fn unknown_result_id_is_a_fault_not_a_frame() {
        let fake = FakeMetricDataClient::with_pages([page(
            vec![result("a", "NetworkOut"), result("zzz", "stray")],
            None,
        )]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![data_query("A", builder_query("a", "NetworkOut"))]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(resp.results["A"].frames.len(), 1);
        assert!(resp.results["A"].error.is_none());
        assert_eq!(resp.faults.len(), 1);
        assert!(matches!(resp.faults[0], QueryError::MalformedResult(_)));
        assert!(!resp.faults[0].to_string().contains("zzz"));
    }

    #[tokio::test]
    async fn length_mismatch_only_affects_its_ref_id() {
        let mut bad = result("b", "NetworkIn");
        bad.values.push(2.0);
        let fake =
            FakeMetricDataClient::with_pages([page(vec![result("a", "NetworkOut"), bad], None)]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![
                    data_query("A", builder_query("a", "NetworkOut")),
                    data_query("B", builder_query("b", "NetworkIn")),
                ]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(frame_name(&resp, "A"), "NetworkOut");
        assert!(resp.results["B"].frames.is_empty());
        assert!(matches!(
            resp.results["B"].error,
            Some(QueryError::MalformedResult(_))
        ));
    }

    #[tokio::test]
    async fn pagination_is_followed_and_pages_merged() {
        let t1 = DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(5);
        let mut second = result("a", "NetworkOut");
        second.values = vec![2.0];
        second.timestamps = vec![t1];

        let mut first = result("a", "NetworkOut");
        first.status_code = StatusCode::PartialData;

        let fake = FakeMetricDataClient::with_pages([
            page(vec![first], Some("token-1")),
            page(vec![second], None),
        ]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![data_query("A", builder_query("a", "NetworkOut"))]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let calls = fake.snapshot();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].next_token, None);
        assert_eq!(calls[1].next_token.as_deref(), Some("token-1"));
        assert_eq!(calls[1].metric_data_queries, calls[0].metric_data_queries);

        let frames = &resp.results["A"].frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].values, vec![1.0, 2.0]);
        assert_eq!(frames[0].timestamps.len(), 2);
        assert_eq!(frames[0].status, StatusCode::Complete);
    }

    #[tokio::test]
    async fn partial_results_are_returned_with_notice() {
        let mut partial = result("a", "NetworkOut");
        partial.status_code = StatusCode::PartialData;
        let fake = FakeMetricDataClient::with_pages([GetMetricDataOutput {
            metric_data_results: vec![partial],
            next_token: None,
            messages: vec![MessageData {
                code: "MaxQueryTimeRangeExceed".into(),
                value: "trimmed".into(),
            }],
        }]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![data_query("A", builder_query("a", "NetworkOut"))]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let frame = &resp.results["A"].frames[0];
        assert_eq!(frame.values, vec![1.0]);
        assert_eq!(frame.status, StatusCode::PartialData);
        assert_eq!(frame.notices.len(), 1);
    }

    #[tokio::test]
    async fn remote_failure_fails_the_call() {
        let fake = FakeMetricDataClient::new();
        fake.push_failure("throttled");
        let err = executor(&fake)
            .query_data(
                &request(vec![data_query("A", builder_query("a", "NetworkOut"))]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::RemoteCallFailed(_)));
        assert_eq!(err.to_string(), "metric data request failed: throttled");
    }

    #[tokio::test]
    async fn cancelled_call_returns_no_frames() {
        let fake = FakeMetricDataClient::with_pages([page(vec![result("a", "NetworkOut")], None)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor(&fake)
            .query_data(
                &request(vec![data_query("A", builder_query("a", "NetworkOut"))]),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
        assert!(fake.snapshot().is_empty());
    }

    /// Signals when an exchange starts, then never answers.
    struct StalledClient {
        started: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl MetricDataClient for StalledClient {
        async fn get_metric_data(
            &self,
            _input: &GetMetricDataInput,
        ) -> anyhow::Result<GetMetricDataOutput> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelling_in_flight_exchange_fails_call() {
        let started = Arc::new(tokio::sync::Notify::new());
        let executor = Executor::new(
            Arc::new(StalledClient {
                started: started.clone(),
            }),
            ExecutorConfig::default(),
        )
        .with_period_resolver(Arc::new(FixedPeriodResolver(60)));
        let cancel = CancellationToken::new();
        let req = request(vec![data_query("A", builder_query("a", "NetworkOut"))]);

        let call = executor.query_data(&req, &cancel);
        let trigger = async {
            started.notified().await;
            cancel.cancel();
        };
        let (result, ()) = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            async { tokio::join!(call, trigger) },
        )
        .await
        .expect("cancelled call must finish");

        assert!(matches!(result, Err(QueryError::Cancelled)));
    }

    #[tokio::test]
    async fn bad_query_does_not_abort_siblings() {
        let fake = FakeMetricDataClient::with_pages([page(vec![result("a", "NetworkOut")], None)]);
        let resp = executor(&fake)
            .query_data(
                &request(vec![
                    data_query("A", builder_query("a", "NetworkOut")),
                    data_query("B", json!({ "period": "soon" })),
                ]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(frame_name(&resp, "A"), "NetworkOut");
        assert!(matches!(
            resp.results["B"].error,
            Some(QueryError::InvalidPeriod(_))
        ));
        assert_eq!(fake.snapshot()[0].metric_data_queries.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_reject_later_query() {
        let fake = FakeMetricDataClient::new();
        let resp = executor(&fake)
            .query_data(
                &request(vec![
                    data_query("A", builder_query("a", "NetworkOut")),
                    data_query("B", builder_query("a", "NetworkIn")),
                ]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(resp.results["A"].error.is_none());
        assert!(matches!(
            resp.results["B"].error,
            Some(QueryError::DuplicateQueryId { .. })
        ));
        assert_eq!(fake.snapshot()[0].metric_data_queries.len(), 1);
    }

    #[tokio::test]
    async fn generated_id_yields_to_later_explicit_id() {
        let fake = FakeMetricDataClient::new();
        let resp = executor(&fake)
            .query_data(
                &request(vec![
                    data_query("A", builder_query("", "NetworkOut")),
                    data_query("B", builder_query("queryA", "NetworkIn")),
                ]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(resp.results["A"].error.is_none());
        assert!(resp.results["B"].error.is_none());
        let ids: Vec<_> = fake.snapshot()[0]
            .metric_data_queries
            .iter()
            .map(|q| q.id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], "queryA");
        assert_eq!(ids[1], "queryA");
    }

    #[tokio::test]
    async fn batches_are_chunked_and_grouped_by_region() {
        let fake = FakeMetricDataClient::new();
        let executor = Executor::new(
            Arc::new(fake.clone()),
            ExecutorConfig {
                default_region: "eu-west-1".into(),
                max_queries_per_call: 2,
            },
        )
        .with_period_resolver(Arc::new(FixedPeriodResolver(60)));

        let mut queries: Vec<DataQuery> = (0..3)
            .map(|i| {
                data_query(
                    &format!("R{i}"),
                    json!({ "id": format!("q{i}"), "region": "us-east-2" }),
                )
            })
            .collect();
        queries.push(data_query("D", json!({ "id": "d" })));

        let resp = executor
            .query_data(&request(queries), &CancellationToken::new())
            .await
            .unwrap();

        let calls = fake.snapshot();
        let sizes: Vec<(String, usize)> = calls
            .iter()
            .map(|c| (c.region.clone(), c.metric_data_queries.len()))
            .collect();
        assert_eq!(
            sizes,
            vec![
                ("eu-west-1".to_string(), 1),
                ("us-east-2".to_string(), 2),
                ("us-east-2".to_string(), 1),
            ]
        );
        assert_eq!(resp.results.len(), 4);
        assert!(resp.results.values().all(|r| r.frames.is_empty() && r.error.is_none()));
    }
}
