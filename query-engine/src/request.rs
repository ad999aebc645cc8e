//! Mapping of normalized queries onto remote request entries.

use crate::client::{Dimension, Metric, MetricDataQuery, MetricStat};
use crate::query::{MetricEditorMode, MetricQuery, MetricQueryType, WILDCARD};

/// Build the request entry for one query, carrying its label directive.
pub fn build_metric_data_query(query: &MetricQuery) -> MetricDataQuery {
    let mut entry = MetricDataQuery {
        id: query.id.clone(),
        label: query.label.clone(),
        metric_stat: None,
        expression: None,
        period: None,
        return_data: query.return_data,
    };

    match (query.metric_query_type, query.metric_editor_mode) {
        (MetricQueryType::Query, _) | (MetricQueryType::Search, MetricEditorMode::Raw) => {
            entry.expression = Some(query.expression.clone());
            entry.period = Some(query.period);
        }
        (MetricQueryType::Search, MetricEditorMode::Builder) if query.is_inferred_search() => {
            entry.expression = Some(build_search_expression(query));
            entry.period = Some(query.period);
        }
        (MetricQueryType::Search, MetricEditorMode::Builder) => {
            entry.metric_stat = Some(MetricStat {
                metric: Metric {
                    namespace: query.namespace.clone(),
                    metric_name: query.metric_name.clone(),
                    dimensions: query
                        .dimensions
                        .iter()
                        .flat_map(|(name, values)| {
                            values.iter().map(move |value| Dimension {
                                name: name.clone(),
                                value: value.clone(),
                            })
                        })
                        .collect(),
                },
                period: query.period,
                stat: query.statistic.clone(),
            });
        }
    }

    entry
}

/// Search expression for builder queries that may fan out into several series.
///
/// Known dimension values become filters; wildcard dimensions only constrain
/// the schema (exact match) or must merely be present (loose match).
pub fn build_search_expression(query: &MetricQuery) -> String {
    let mut search_term = format!("MetricName=\"{}\"", escape_double_quotes(&query.metric_name));
    let mut wildcard_dimensions = Vec::new();

    for (name, values) in query.dimensions.iter() {
        if values.iter().any(|v| v == WILDCARD) {
            wildcard_dimensions.push(name.as_str());
            continue;
        }
        let mut value_expr = join_quoted(values.iter().map(String::as_str), " OR ");
        if values.len() > 1 {
            value_expr = format!("({value_expr})");
        }
        append_term(&mut search_term, &format!("\"{}\"={value_expr}", escape_double_quotes(name)));
    }

    if query.match_exact {
        let mut schema = format!("\"{}\"", escape_double_quotes(&query.namespace));
        if !query.dimensions.is_empty() {
            schema.push(',');
            schema.push_str(&join_quoted(query.dimensions.iter().map(|(n, _)| n.as_str()), ","));
        }
        return format!(
            "REMOVE_EMPTY(SEARCH('{{{schema}}} {search_term}', '{}', {}))",
            query.statistic, query.period
        );
    }

    append_term(&mut search_term, &join_quoted(wildcard_dimensions.into_iter(), " "));
    format!(
        "REMOVE_EMPTY(SEARCH('Namespace=\"{}\" {search_term}', '{}', {}))",
        escape_double_quotes(&query.namespace),
        query.statistic,
        query.period
    )
}

fn append_term(search: &mut String, term: &str) {
    if term.is_empty() {
        return;
    }
    if !search.is_empty() {
        search.push(' ');
    }
    search.push_str(term);
}

fn join_quoted<'a>(items: impl Iterator<Item = &'a str>, sep: &str) -> String {
    items
        .map(|i| format!("\"{}\"", escape_double_quotes(i)))
        .collect::<Vec<_>>()
        .join(sep)
}

fn escape_double_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}
