//! Offline validate and check commands.
use crate::cli::{CheckArgs, ValidateArgs};
use crate::completeness::check_completeness;
use crate::engine::parse_answer;
use crate::schema::{AnalysisResult, AnalysisStepSet};
use crate::validate::step_set_violation;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Validate a step-set file; an invalid set is an error.
pub(crate) fn run_validate(args: &ValidateArgs) -> Result<()> {
    let candidate = read_json(&args.steps)?;
    if let Some(violation) = step_set_violation(&candidate) {
        return Err(anyhow!(
            "invalid step set {}: {violation}",
            args.steps.display()
        ));
    }
    let steps = AnalysisStepSet::from_validated(candidate)?;
    if args.verbose {
        for step in &steps.analysis_steps {
            eprintln!("  {} ({})", step.category, step.kind);
        }
    }
    println!(
        "valid: {} with {} applicable steps",
        steps.document_type,
        steps.analysis_steps.len()
    );
    Ok(())
}

/// Check a result against a step set and print the missing-data index.
pub(crate) fn run_check(args: &CheckArgs) -> Result<()> {
    let candidate = read_json(&args.steps)?;
    if let Some(violation) = step_set_violation(&candidate) {
        return Err(anyhow!(
            "invalid step set {}: {violation}",
            args.steps.display()
        ));
    }
    let steps = AnalysisStepSet::from_validated(candidate)?;

    let result = match read_json(&args.result)? {
        Value::Object(map) => AnalysisResult::from(map),
        _ => {
            return Err(anyhow!(
                "analysis result {} must be a JSON object",
                args.result.display()
            ))
        }
    };

    let check = check_completeness(&result, &steps.categories());
    let report = json!({
        "complete": check.complete,
        "missing": check.missing,
    });
    let text = serde_json::to_string_pretty(&report).context("serialize check report")?;
    println!("{text}");
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_answer(&text).with_context(|| format!("parse {}", path.display()))
}
