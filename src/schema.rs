//! Schema types for analysis step sets and accumulated results.

use crate::validate::is_declined;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Key under which the document classification is stored in a result.
pub const DOCUMENT_TYPE_KEY: &str = "document_type";

/// Placeholder the LM returns for a text field it could not find.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// Shape of the answer requested for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Text,
    List,
    Table { columns: Vec<String> },
}

impl StepKind {
    /// Type names accepted in a step-set `type` field.
    pub const NAMES: [&'static str; 3] = ["text", "list", "table"];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::List => "list",
            Self::Table { .. } => "table",
        }
    }

    /// Build a kind from its wire name; `columns` only matters for tables.
    pub fn from_parts(name: &str, columns: Vec<String>) -> Result<Self> {
        match name {
            "text" => Ok(Self::Text),
            "list" => Ok(Self::List),
            "table" => {
                if columns.is_empty() || columns.iter().any(|col| col.trim().is_empty()) {
                    return Err(anyhow!("table steps need at least one non-blank column"));
                }
                Ok(Self::Table { columns })
            }
            other => Err(anyhow!(
                "unknown step type {other:?} (expected one of: {})",
                Self::NAMES.join(", ")
            )),
        }
    }

    /// Lists and tables ask for every occurrence, text asks for one value.
    pub fn is_plural(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire form of a step as exchanged with the LM and persisted by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepRecord {
    category: String,
    applicable: bool,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<Value>,
    reason: String,
}

/// One requested extraction unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StepRecord", into = "StepRecord")]
pub struct AnalysisStep {
    pub category: String,
    pub applicable: bool,
    pub kind: StepKind,
    pub reason: String,
}

impl TryFrom<StepRecord> for AnalysisStep {
    type Error = String;

    fn try_from(record: StepRecord) -> std::result::Result<Self, Self::Error> {
        if record.category.trim().is_empty() {
            return Err("step category must be non-empty".to_string());
        }
        let columns = if record.kind == "table" {
            table_columns(record.columns)
                .map_err(|err| format!("step {:?}: {err}", record.category))?
        } else {
            Vec::new()
        };
        let kind = StepKind::from_parts(&record.kind, columns)
            .map_err(|err| format!("step {:?}: {err}", record.category))?;
        Ok(Self {
            category: record.category,
            applicable: record.applicable,
            kind,
            reason: record.reason,
        })
    }
}

/// Columns are only read for tables; other kinds may carry anything there.
fn table_columns(columns: Option<Value>) -> std::result::Result<Vec<String>, String> {
    let Some(Value::Array(items)) = columns else {
        return Err("table steps need a list of columns".to_string());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(column) => Ok(column),
            other => Err(format!("column {other} is not a string")),
        })
        .collect()
}

impl From<AnalysisStep> for StepRecord {
    fn from(step: AnalysisStep) -> Self {
        let kind = step.kind.name().to_string();
        let columns = match step.kind {
            StepKind::Table { columns } => Some(Value::from(columns)),
            StepKind::Text | StepKind::List => None,
        };
        Self {
            category: step.category,
            applicable: step.applicable,
            kind,
            columns,
            reason: step.reason,
        }
    }
}

/// Document classification plus the ordered, applicable extraction steps.
///
/// Held immutable once accepted for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStepSet {
    pub document_type: String,
    pub analysis_steps: Vec<AnalysisStep>,
}

impl AnalysisStepSet {
    /// Convert a candidate that already passed schema validation, keeping
    /// only the applicable steps.
    ///
    /// A repeated category keeps its first occurrence.
    pub fn from_validated(mut candidate: Value) -> Result<Self> {
        if let Some(steps) = candidate
            .get_mut("analysis_steps")
            .and_then(Value::as_array_mut)
        {
            steps.retain(|step| !is_declined(step));
        }
        let mut set: AnalysisStepSet =
            serde_json::from_value(candidate).context("decode analysis step set")?;
        let mut seen = BTreeSet::new();
        set.analysis_steps.retain(|step| {
            if !step.applicable {
                return false;
            }
            if !seen.insert(step.category.clone()) {
                tracing::warn!(category = %step.category, "dropping repeated analysis step");
                return false;
            }
            true
        });
        Ok(set)
    }

    /// Category names in declaration order.
    pub fn categories(&self) -> Vec<&str> {
        self.analysis_steps
            .iter()
            .map(|step| step.category.as_str())
            .collect()
    }
}

/// Accumulated extraction output keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    values: Map<String, Value>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.values.get(category)
    }

    pub fn get_mut(&mut self, category: &str) -> Option<&mut Value> {
        self.values.get_mut(category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.values.contains_key(category)
    }

    pub fn insert(&mut self, category: impl Into<String>, value: Value) {
        self.values.insert(category.into(), value);
    }

    /// Merge every key of a parsed answer object, later keys winning.
    pub fn extend_from_object(&mut self, object: Map<String, Value>) {
        self.values.extend(object);
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<Map<String, Value>> for AnalysisResult {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// True when a value counts as empty for completeness purposes.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// True when a value is the literal `"Unknown"` placeholder.
pub fn is_placeholder(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_PLACEHOLDER)
}
