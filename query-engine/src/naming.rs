//! Frame naming decision table.

use crate::client::MetricDataResult;
use crate::query::{MetricEditorMode, MetricQuery, MetricQueryType};

/// Where a frame's display name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameNameRule {
    /// The label the backend returned (already interpolated when an alias was sent).
    BackendLabel,
    /// The request id; expression results have no natural series identity.
    QueryId,
    /// `<metricName>_<statistic>`.
    MetricStat,
}

/// The facts about a query the naming decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingFacts {
    pub has_label: bool,
    pub query_type: MetricQueryType,
    pub editor_mode: MetricEditorMode,
    pub match_exact: bool,
    pub dimension_values: usize,
}

impl NamingFacts {
    pub fn of(query: &MetricQuery) -> Self {
        Self {
            has_label: query.label.is_some(),
            query_type: query.metric_query_type,
            editor_mode: query.metric_editor_mode,
            match_exact: query.match_exact,
            dimension_values: query.dimensions.value_count(),
        }
    }
}

/// Ordered rules; the first matching arm wins.
pub fn frame_name_rule(facts: NamingFacts) -> FrameNameRule {
    use MetricEditorMode::*;
    use MetricQueryType::*;

    match (
        facts.has_label,
        facts.query_type,
        facts.editor_mode,
        facts.match_exact,
        facts.dimension_values,
    ) {
        (true, _, _, _, _) => FrameNameRule::BackendLabel,
        (false, Search, Raw, _, _) => FrameNameRule::QueryId,
        (false, Query, _, _, _) => FrameNameRule::BackendLabel,
        (false, Search, Builder, false, _) => FrameNameRule::BackendLabel,
        (false, Search, Builder, true, 0 | 1) => FrameNameRule::BackendLabel,
        (false, Search, Builder, true, _) => FrameNameRule::MetricStat,
    }
}

/// Display name for one result series of `query`.
pub fn frame_name(query: &MetricQuery, result: &MetricDataResult) -> String {
    match frame_name_rule(NamingFacts::of(query)) {
        FrameNameRule::BackendLabel => match result.label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => query.id.clone(),
        },
        FrameNameRule::QueryId => query.id.clone(),
        FrameNameRule::MetricStat => format!("{}_{}", query.metric_name, query.statistic),
    }
}
