//! Reconcile follow-up (missing-data) answers into an accumulated result.
//!
//! Sequence-valued categories are merged item by item without duplicates.
//! Item identity is a canonical form of the item: objects compare as an
//! unordered set of key/value pairs, scalars compare as themselves.
use crate::schema::{is_empty_value, is_placeholder, AnalysisResult};
use serde_json::Value;
use std::collections::BTreeSet;

/// Key carrying the per-category payload in a follow-up answer.
pub const FOLLOWUP_CATEGORIES_KEY: &str = "categories";

/// Merge a follow-up answer into a copy of `base`.
///
/// Answers without a usable `categories` object leave the base unchanged.
pub fn merge_missing(base: &AnalysisResult, followup: &Value) -> AnalysisResult {
    let mut merged = base.clone();
    let categories = followup
        .get(FOLLOWUP_CATEGORIES_KEY)
        .and_then(Value::as_object)
        .filter(|categories| !categories.is_empty());
    let Some(categories) = categories else {
        tracing::error!("no missing data to merge into analysis result");
        return merged;
    };

    for (category, incoming) in categories {
        if !merged.contains(category) {
            tracing::debug!(category = %category, "category not in analysis result, adding it");
            merged.insert(category.clone(), Value::Array(Vec::new()));
        }
        let Some(current) = merged.get_mut(category) else {
            continue;
        };
        match incoming {
            Value::Array(items) => merge_items(current, items),
            scalar => fill_placeholder(current, scalar),
        }
    }

    merged
}

fn merge_items(current: &mut Value, items: &[Value]) {
    if !current.is_array() {
        if !needs_value(current) {
            tracing::debug!("keeping populated non-list value over follow-up list");
            return;
        }
        *current = Value::Array(Vec::new());
    }
    let Value::Array(existing) = current else {
        return;
    };

    let mut seen: BTreeSet<String> = existing.iter().map(canonical_form).collect();
    for item in items {
        if seen.insert(canonical_form(item)) {
            existing.push(item.clone());
        }
    }
}

/// Non-sequence answers only replace a value that is still unmet.
fn fill_placeholder(current: &mut Value, incoming: &Value) {
    if needs_value(current) && !needs_value(incoming) {
        *current = incoming.clone();
    }
}

fn needs_value(value: &Value) -> bool {
    is_empty_value(value) || is_placeholder(value)
}

/// Render a value with object keys sorted at every level.
pub fn canonical_form(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let body = pairs
                .into_iter()
                .map(|(key, value)| {
                    format!("{}:{}", Value::String(key.clone()), canonical_form(value))
                })
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        Value::Array(items) => {
            let body = items.iter().map(canonical_form).collect::<Vec<_>>().join(",");
            format!("[{body}]")
        }
        scalar => scalar.to_string(),
    }
}
