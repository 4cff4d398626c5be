//! Structural validation of step-determination responses.
//!
//! A step set is only trusted after it passes these checks. Validation fails
//! closed: the first violation wins and is reported through the log, never
//! raised to the caller.
use crate::schema::StepKind;
use serde_json::Value;

/// Validate a candidate step set, logging the first violation found.
pub fn validate_step_set(candidate: &Value) -> bool {
    match step_set_violation(candidate) {
        None => true,
        Some(message) => {
            tracing::error!(violation = %message, "analysis steps rejected");
            false
        }
    }
}

/// Describe the first schema violation in a candidate step set, if any.
///
/// Rules are checked in order and short-circuit on the first failure. A
/// reported index refers to the step's position in the raw candidate.
pub fn step_set_violation(candidate: &Value) -> Option<String> {
    let Some(data) = candidate.as_object().filter(|map| !map.is_empty()) else {
        return Some("analysis steps are not a valid object".to_string());
    };

    if non_blank_str(data.get("document_type")).is_none() {
        return Some("missing or invalid 'document_type'".to_string());
    }

    let steps = match data.get("analysis_steps").and_then(Value::as_array) {
        Some(steps) if !steps.is_empty() => steps,
        _ => return Some("missing or invalid 'analysis_steps'".to_string()),
    };

    steps
        .iter()
        .enumerate()
        .filter(|(_, step)| !is_declined(step))
        .find_map(|(index, step)| step_violation(index, step))
}

/// Steps explicitly marked `"applicable": false` are discarded unchecked.
pub(crate) fn is_declined(step: &Value) -> bool {
    step.get("applicable") == Some(&Value::Bool(false))
}

fn step_violation(index: usize, step: &Value) -> Option<String> {
    let Some(step) = step.as_object() else {
        return Some(format!("analysis step at index {index} is not an object"));
    };

    if non_blank_str(step.get("category")).is_none() {
        return Some(format!(
            "missing or invalid 'category' in analysis step at index {index}"
        ));
    }

    if !matches!(step.get("applicable"), Some(Value::Bool(_))) {
        return Some(format!(
            "missing or invalid 'applicable' in analysis step at index {index}"
        ));
    }

    let Some(kind) = non_blank_str(step.get("type")) else {
        return Some(format!(
            "missing or invalid 'type' in analysis step at index {index}"
        ));
    };
    if !StepKind::NAMES.contains(&kind) {
        return Some(format!(
            "invalid 'type' {kind:?} in analysis step at index {index}; possible values are: {}",
            StepKind::NAMES.join(", ")
        ));
    }

    if kind == "table" {
        let columns = match step.get("columns").and_then(Value::as_array) {
            Some(columns) if !columns.is_empty() => columns,
            _ => {
                return Some(format!(
                    "missing or invalid 'columns' in analysis step at index {index}"
                ))
            }
        };
        if !columns.iter().all(|col| non_blank_str(Some(col)).is_some()) {
            return Some(format!(
                "invalid column entries in analysis step at index {index}"
            ));
        }
    }

    if non_blank_str(step.get("reason")).is_none() {
        return Some(format!(
            "missing or invalid 'reason' in analysis step at index {index}"
        ));
    }

    None
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
