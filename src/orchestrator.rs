//! Analysis orchestration.
//!
//! A run moves through two bounded phases against one source document:
//!
//! 1. Determining steps: ask the engine for a step set until one validates
//!    and keeps at least one applicable step.
//! 2. Extracting: one full pass over every step, then completeness checks
//!    and follow-up queries that only ever fill gaps.
//!
//! Both phases share the same iteration budget. Step exhaustion is an
//! `Ok(None)` outcome; engine transport failures propagate.
use crate::completeness::{check_completeness, MissingData};
use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::engine::{extract_json, parse_answer, QueryEngine};
use crate::error::AnalysisError;
use crate::merge::merge_missing;
use crate::prompts::{ExtractionContext, PromptRegistry};
use crate::response_log::ResponseRecorder;
use crate::schema::{AnalysisResult, AnalysisStepSet, DOCUMENT_TYPE_KEY};
use crate::util::sha256_hex;
use crate::validate::validate_step_set;
use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

/// Recorder label for step-determination exchanges.
pub const STEPS_LABEL: &str = "analysis_steps";
/// Prefix of recorder labels for follow-up exchanges.
pub const FOLLOWUP_LABEL_PREFIX: &str = "custom_prompt_";

/// Final state of a run that got past step determination.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    #[serde(rename = "analysis")]
    pub result: AnalysisResult,
    pub steps: AnalysisStepSet,
    /// Extraction iterations used, full pass included.
    pub iterations: usize,
    #[serde(skip)]
    pub step_attempts: usize,
    pub complete: bool,
    pub missing: MissingData,
}

/// Drives one source document through step determination and extraction.
pub struct Orchestrator<'a> {
    engine: &'a mut dyn QueryEngine,
    recorder: &'a mut dyn ResponseRecorder,
    prompts: &'a PromptRegistry,
    max_iterations: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        engine: &'a mut dyn QueryEngine,
        recorder: &'a mut dyn ResponseRecorder,
        prompts: &'a PromptRegistry,
    ) -> Self {
        Self {
            engine,
            recorder,
            prompts,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Override the per-phase budget; values below 1 become 1.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Analyze `source`, returning `None` when no acceptable step set was
    /// produced within the budget.
    pub fn run(&mut self, source: &Path) -> Result<Option<AnalysisRun>> {
        let Some((steps, step_attempts)) = self.determine_steps(source)? else {
            tracing::error!(
                attempts = self.max_iterations,
                "could not determine analysis steps"
            );
            return Ok(None);
        };
        let categories: Vec<String> = steps
            .categories()
            .into_iter()
            .map(str::to_string)
            .collect();
        tracing::info!(
            document_type = %steps.document_type,
            steps = categories.len(),
            attempts = step_attempts,
            "analysis steps accepted"
        );

        let mut result = AnalysisResult::new();
        let mut missing = MissingData::default();
        let mut complete = false;
        let mut iterations = 0;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;
            if missing.is_empty() {
                tracing::info!(iteration, "running full extraction pass");
                result = self.extract(&steps)?;
            } else {
                tracing::info!(iteration, missing = missing.len(), "requesting missing data");
                let prompt = self.prompts.followup_prompt(&result, &categories, &missing);
                let followup = self.query_followup(&prompt)?;
                result = merge_missing(&result, &followup);
            }

            let check = check_completeness(&result, &categories);
            complete = check.complete;
            missing = check.missing;
            if complete {
                tracing::info!(iteration, "analysis complete");
                break;
            }
        }

        if !complete {
            tracing::warn!(
                iterations,
                missing = missing.len(),
                "iteration budget exhausted with incomplete analysis"
            );
        }

        Ok(Some(AnalysisRun {
            result,
            steps,
            iterations,
            step_attempts,
            complete,
            missing,
        }))
    }

    /// Run only the step-determination phase, returning the accepted set and
    /// the attempt that produced it.
    pub fn determine_steps(&mut self, source: &Path) -> Result<Option<(AnalysisStepSet, usize)>> {
        if !source.exists() {
            return Err(AnalysisError::MissingSource(source.to_path_buf()).into());
        }
        tracing::info!(source = %source.display(), "starting analysis");
        let prompts = self.prompts;
        for attempt in 1..=self.max_iterations {
            tracing::info!(attempt, "determining analysis steps");
            let raw = self.engine.determine_steps(source)?;
            let candidate = match parse_answer(&raw) {
                Ok(candidate) => candidate,
                Err(err) => {
                    tracing::error!(attempt, error = %format!("{err:#}"), "step set is not valid JSON");
                    self.record(
                        prompts.initial_analysis(),
                        &Value::String(raw.trim().to_string()),
                        STEPS_LABEL,
                    );
                    continue;
                }
            };
            self.record(prompts.initial_analysis(), &candidate, STEPS_LABEL);

            if !validate_step_set(&candidate) {
                continue;
            }
            let steps = match AnalysisStepSet::from_validated(candidate) {
                Ok(steps) => steps,
                Err(err) => {
                    tracing::error!(attempt, error = %format!("{err:#}"), "analysis steps rejected");
                    continue;
                }
            };
            if steps.analysis_steps.is_empty() {
                tracing::error!(attempt, "no applicable analysis steps");
                continue;
            }
            return Ok(Some((steps, attempt)));
        }
        Ok(None)
    }

    fn extract(&mut self, steps: &AnalysisStepSet) -> Result<AnalysisResult> {
        let mut result = AnalysisResult::new();
        result.insert(
            DOCUMENT_TYPE_KEY,
            Value::String(steps.document_type.clone()),
        );
        let mut context = ExtractionContext::default();
        context.push(json!({ DOCUMENT_TYPE_KEY: steps.document_type }).to_string());

        for step in &steps.analysis_steps {
            let category = step.category.as_str();
            let prompt = context.apply(&self.prompts.extraction_prompt(step));
            tracing::debug!(category, prompt = %prompt, "querying category");
            let raw = self.engine.answer(&prompt)?;

            match parse_answer(&raw) {
                Ok(Value::Object(object)) => {
                    self.record(&prompt, &Value::Object(object.clone()), category);
                    result.extend_from_object(object);
                }
                Ok(value) => {
                    self.record(&prompt, &value, category);
                    result.insert(category, value);
                }
                Err(err) => {
                    tracing::error!(
                        category,
                        error = %format!("{err:#}"),
                        "failed to parse answer, keeping raw text"
                    );
                    let value = Value::String(raw.trim().to_string());
                    self.record(&prompt, &value, category);
                    result.insert(category, value);
                }
            }
            context.push(extract_json(&raw).to_string());
        }
        Ok(result)
    }

    fn query_followup(&mut self, prompt: &str) -> Result<Value> {
        let label = format!("{FOLLOWUP_LABEL_PREFIX}{}", sha256_hex(prompt.as_bytes()));
        tracing::debug!(label = %label, prompt = %prompt, "querying missing data");
        let raw = self.engine.answer(prompt)?;
        let value = match parse_answer(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "failed to parse follow-up answer");
                Value::String(raw.trim().to_string())
            }
        };
        self.record(prompt, &value, &label);
        Ok(value)
    }

    fn record(&mut self, prompt: &str, response: &Value, label: &str) {
        if let Err(err) = self.recorder.record(prompt, response, label) {
            tracing::warn!(label, error = %format!("{err:#}"), "failed to record LM response");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
