//! Completeness classification of an accumulated analysis result.
use crate::schema::{is_empty_value, is_placeholder, AnalysisResult};
use serde::Serialize;
use std::fmt;

/// Why a required category is not yet satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    Missing,
    Empty,
    Unknown,
}

impl MissingReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Missing => "is missing in analysis result",
            Self::Empty => "is empty in analysis result",
            Self::Unknown => "is Unknown in analysis result",
        }
    }
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Unmet categories in declaration order, recomputed on every check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingData {
    entries: Vec<(String, MissingReason)>,
}

impl MissingData {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MissingReason)> {
        self.entries.iter().map(|(name, reason)| (name.as_str(), *reason))
    }

    fn push(&mut self, category: &str, reason: MissingReason) {
        self.entries.push((category.to_string(), reason));
    }
}

impl Serialize for MissingData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, reason) in &self.entries {
            map.serialize_entry(category, reason.describe())?;
        }
        map.end()
    }
}

/// Outcome of a completeness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    pub complete: bool,
    pub missing: MissingData,
}

/// Classify every required category of `result` as present, missing, empty,
/// or placeholder.
///
/// An empty result is reported incomplete with no per-category detail.
pub fn check_completeness<S: AsRef<str>>(
    result: &AnalysisResult,
    required_categories: &[S],
) -> Completeness {
    let mut missing = MissingData::default();
    if result.is_empty() {
        return Completeness {
            complete: false,
            missing,
        };
    }

    for category in required_categories {
        let category = category.as_ref();
        let reason = match result.get(category) {
            None => MissingReason::Missing,
            // Empty wins over Unknown for the same category.
            Some(value) if is_empty_value(value) => MissingReason::Empty,
            Some(value) if is_placeholder(value) => MissingReason::Unknown,
            Some(_) => continue,
        };
        tracing::info!(category, reason = %reason, "category incomplete");
        missing.push(category, reason);
    }

    Completeness {
        complete: missing.is_empty(),
        missing,
    }
}
