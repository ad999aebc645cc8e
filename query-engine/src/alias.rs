//! Migration of legacy `{{ token }}` aliases to dynamic label syntax.
//!
//! Saved queries written before dynamic labels existed reference series
//! properties as `{{ period }}` or `{{ InstanceId }}`. The backend only
//! understands `${PROP('Period')}` / `${PROP('Dim.InstanceId')}`, so every
//! legacy token is rewritten before the label is sent.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static LEGACY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").expect("legacy alias pattern is valid"));

/// Rewrite every legacy token in `alias` into `${PROP('...')}` form.
///
/// Aliases without legacy tokens are returned unchanged.
pub fn migrate_alias(alias: &str) -> Cow<'_, str> {
    LEGACY_TOKEN.replace_all(alias, |caps: &Captures<'_>| {
        format!("${{PROP('{}')}}", canonical_property(caps[1].trim()))
    })
}

/// Resolve the label directive for a query: an explicit `label` wins,
/// otherwise the migrated `alias`. Empty results mean "no directive".
pub fn resolve_label(label: Option<&str>, alias: &str) -> Option<String> {
    if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
        return Some(label.to_string());
    }
    if alias.trim().is_empty() {
        return None;
    }
    Some(migrate_alias(alias).into_owned())
}

fn canonical_property(token: &str) -> String {
    match token {
        "period" => "Period".to_string(),
        dimension => format!("Dim.{dimension}"),
    }
}
