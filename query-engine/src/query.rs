//! Per-query JSON model and its normalization into [`MetricQuery`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::alias;
use crate::error::QueryError;
use crate::period::PeriodResolver;
use crate::time_range::TimeRange;

/// Dimension value meaning "any value".
pub const WILDCARD: &str = "*";

const DEFAULT_STATISTIC: &str = "Average";

static REF_ID_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("ref id pattern is valid"));

// ------------------------------------------------------------------ //
//  Modes                                                              //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MetricQueryType {
    #[default]
    Search,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MetricEditorMode {
    #[default]
    Builder,
    Raw,
}

/// Modes are persisted as integers by the editor; names are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Number(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for MetricQueryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ModeRepr::deserialize(deserializer)? {
            ModeRepr::Number(0) => Ok(MetricQueryType::Search),
            ModeRepr::Number(1) => Ok(MetricQueryType::Query),
            ModeRepr::Name(n) if n.eq_ignore_ascii_case("search") => Ok(MetricQueryType::Search),
            ModeRepr::Name(n) if n.eq_ignore_ascii_case("query") => Ok(MetricQueryType::Query),
            ModeRepr::Number(n) => Err(serde::de::Error::custom(format!(
                "unknown metricQueryType {n}"
            ))),
            ModeRepr::Name(n) => Err(serde::de::Error::custom(format!(
                "unknown metricQueryType \"{n}\""
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for MetricEditorMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ModeRepr::deserialize(deserializer)? {
            ModeRepr::Number(0) => Ok(MetricEditorMode::Builder),
            ModeRepr::Number(1) => Ok(MetricEditorMode::Raw),
            ModeRepr::Name(n) if n.eq_ignore_ascii_case("builder") => Ok(MetricEditorMode::Builder),
            ModeRepr::Name(n) if n.eq_ignore_ascii_case("raw") => Ok(MetricEditorMode::Raw),
            ModeRepr::Number(n) => Err(serde::de::Error::custom(format!(
                "unknown metricEditorMode {n}"
            ))),
            ModeRepr::Name(n) => Err(serde::de::Error::custom(format!(
                "unknown metricEditorMode \"{n}\""
            ))),
        }
    }
}

// ------------------------------------------------------------------ //
//  Dimensions                                                         //
// ------------------------------------------------------------------ //

/// Dimension name → ordered values, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dimensions(BTreeMap<String, Vec<String>>);

impl Dimensions {
    pub fn new(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of values across all dimensions.
    pub fn value_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.values().flatten().any(|v| v == WILDCARD)
    }

    pub fn is_multi_valued(&self) -> bool {
        self.0.values().any(|v| v.len() > 1)
    }
}

/// Older saved queries store a single value as a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum DimensionValues {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, DimensionValues>::deserialize(deserializer)?;
        Ok(Dimensions(
            raw.into_iter()
                .map(|(name, values)| match values {
                    DimensionValues::One(v) => (name, vec![v]),
                    DimensionValues::Many(vs) => (name, vs),
                })
                .collect(),
        ))
    }
}

// ------------------------------------------------------------------ //
//  Raw JSON model                                                     //
// ------------------------------------------------------------------ //

#[derive(Deserialize)]
#[serde(untagged)]
enum PeriodRepr {
    Seconds(i64),
    Text(String),
    Other(serde_json::Value),
}

impl fmt::Display for PeriodRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodRepr::Seconds(s) => write!(f, "{s}"),
            PeriodRepr::Text(t) => f.write_str(t),
            PeriodRepr::Other(v) => write!(f, "{v}"),
        }
    }
}

/// The query JSON exactly as saved by the editor.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryModel {
    #[serde(default)]
    id: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    metric_name: String,
    #[serde(default)]
    dimensions: Option<Dimensions>,
    #[serde(default)]
    statistic: Option<String>,
    #[serde(default)]
    statistics: Option<Vec<String>>,
    #[serde(default)]
    period: Option<PeriodRepr>,
    #[serde(default)]
    expression: String,
    #[serde(default)]
    sql_expression: String,
    #[serde(default)]
    metric_query_type: Option<MetricQueryType>,
    #[serde(default)]
    metric_editor_mode: Option<MetricEditorMode>,
    #[serde(default)]
    match_exact: Option<bool>,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    hide: bool,
}

// ------------------------------------------------------------------ //
//  Normalized model                                                   //
// ------------------------------------------------------------------ //

/// One fully defaulted query, ready to be mapped onto a request entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub ref_id: String,
    pub id: String,
    pub region: String,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Dimensions,
    pub statistic: String,
    pub period: u32,
    pub expression: String,
    pub metric_query_type: MetricQueryType,
    pub metric_editor_mode: MetricEditorMode,
    pub match_exact: bool,
    /// Label directive after alias migration; `None` when the user set none.
    pub label: Option<String>,
    pub return_data: bool,
    pub time_range: TimeRange,
}

impl MetricQuery {
    /// Builder queries that can match more than one series are sent as a
    /// search expression instead of a single metric stat.
    pub fn is_inferred_search(&self) -> bool {
        if self.metric_query_type != MetricQueryType::Search
            || self.metric_editor_mode != MetricEditorMode::Builder
        {
            return false;
        }
        !self.match_exact || self.dimensions.is_multi_valued() || self.dimensions.has_wildcard()
    }
}

/// Read-only inputs shared by every query of a call.
pub struct NormalizeContext<'a> {
    pub default_region: &'a str,
    pub period_resolver: &'a dyn PeriodResolver,
    /// Ids written explicitly by any query of the call; never generated.
    pub reserved_ids: &'a HashSet<String>,
}

/// Parse one query's JSON into a [`MetricQuery`], applying defaults.
pub fn normalize(
    ref_id: &str,
    time_range: TimeRange,
    json: &serde_json::Value,
    ctx: &NormalizeContext<'_>,
) -> Result<MetricQuery, QueryError> {
    let model = QueryModel::deserialize(json).map_err(|e| QueryError::InvalidQuery {
        ref_id: ref_id.to_string(),
        reason: e.to_string(),
    })?;

    let period = match model.period {
        None => ctx.period_resolver.resolve(&time_range),
        Some(PeriodRepr::Text(ref t)) if t.is_empty() || t == "auto" => {
            ctx.period_resolver.resolve(&time_range)
        }
        Some(repr) => parse_period(&repr)?,
    };

    let statistic = model
        .statistic
        .filter(|s| !s.is_empty())
        .or_else(|| model.statistics.and_then(|s| s.into_iter().find(|s| !s.is_empty())))
        .unwrap_or_else(|| DEFAULT_STATISTIC.to_string());

    let region = if model.region.is_empty() || model.region == "default" {
        ctx.default_region.to_string()
    } else {
        model.region
    };

    let metric_query_type = model.metric_query_type.unwrap_or_default();
    let expression = match metric_query_type {
        MetricQueryType::Query if !model.sql_expression.is_empty() => model.sql_expression,
        _ => model.expression,
    };

    Ok(MetricQuery {
        ref_id: ref_id.to_string(),
        id: if model.id.is_empty() {
            generate_id(ref_id, ctx.reserved_ids)
        } else {
            model.id
        },
        region,
        namespace: model.namespace,
        metric_name: model.metric_name,
        dimensions: model.dimensions.unwrap_or_default(),
        statistic,
        period,
        expression,
        metric_query_type,
        metric_editor_mode: model.metric_editor_mode.unwrap_or_default(),
        match_exact: model.match_exact.unwrap_or(true),
        label: alias::resolve_label(model.label.as_deref(), &model.alias),
        return_data: !model.hide,
        time_range,
    })
}

fn parse_period(repr: &PeriodRepr) -> Result<u32, QueryError> {
    let seconds = match repr {
        PeriodRepr::Seconds(s) => *s,
        PeriodRepr::Text(t) => t
            .trim()
            .parse::<i64>()
            .map_err(|_| QueryError::InvalidPeriod(t.clone()))?,
        PeriodRepr::Other(v) => return Err(QueryError::InvalidPeriod(v.to_string())),
    };
    u32::try_from(seconds)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| QueryError::InvalidPeriod(repr.to_string()))
}

/// Backend ids must start with a lowercase letter; ref ids usually don't.
fn generate_id(ref_id: &str, reserved: &HashSet<String>) -> String {
    if REF_ID_SUFFIX.is_match(ref_id) {
        let id = format!("query{ref_id}");
        if !reserved.contains(&id) {
            return id;
        }
    }
    format!("query{}", uuid::Uuid::new_v4().simple())
}

/// The non-empty `id` a query's JSON sets, if any.
pub fn explicit_id(json: &serde_json::Value) -> Option<&str> {
    json.get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
}
