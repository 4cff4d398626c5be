//! Prompt assembly for step determination, extraction, and follow-ups.
//!
//! Handcrafted templates are compiled in from `prompts/` and can be extended
//! or overridden per workspace. Categories without a template get a generic
//! prompt shaped by the step kind.
use crate::completeness::MissingData;
use crate::schema::{AnalysisResult, AnalysisStep, StepKind, DOCUMENT_TYPE_KEY};
use crate::util::render_template;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// Prompt templates loaded at compile time
const INITIAL_ANALYSIS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/initial_analysis.md"
));
const MISSING_DATA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/missing_data.md"
));
const DOCUMENT_TYPE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/document_type.md"
));
const OBLIGATIONS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/obligations.md"
));
const RISKS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/risks.md"));
const DATES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/dates.md"));
const SIGNATURE_FIELDS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/signature_fields.md"
));

/// Template name for the step-determination prompt.
pub const INITIAL_ANALYSIS_NAME: &str = "initial_analysis";
/// Template name for the missing-data follow-up prompt.
pub const MISSING_DATA_NAME: &str = "missing_data";

const JSON_ONLY: &str = "Your entire response/output is going to consist of a single JSON object {}, and you will NOT wrap it within JSON markdown markers.";
const ALREADY_EXTRACTED: &str = "The following information has already been extracted:";

/// Registered prompt templates keyed by category.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    initial_analysis: String,
    missing_data: String,
    categories: BTreeMap<String, String>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptRegistry {
    /// Registry with the compiled-in templates only.
    pub fn builtin() -> Self {
        let categories = [
            (DOCUMENT_TYPE_KEY, DOCUMENT_TYPE),
            ("obligations", OBLIGATIONS),
            ("risks", RISKS),
            ("dates", DATES),
            ("signature_fields", SIGNATURE_FIELDS),
        ]
        .into_iter()
        .map(|(name, template)| (name.to_string(), template.to_string()))
        .collect();
        Self {
            initial_analysis: INITIAL_ANALYSIS.to_string(),
            missing_data: MISSING_DATA.to_string(),
            categories,
        }
    }

    /// Register every `<name>.md` file in `dir`, overriding built-ins.
    pub fn load_overrides(&mut self, dir: &Path) -> Result<usize> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("read prompts dir {}", dir.display()))?;
        let mut loaded = 0;
        for entry in entries {
            let path = entry.context("read prompts dir entry")?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let template = fs::read_to_string(&path)
                .with_context(|| format!("read prompt template {}", path.display()))?;
            tracing::debug!(name, path = %path.display(), "registered prompt template");
            self.register(name, template);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn register(&mut self, name: &str, template: String) {
        match name {
            INITIAL_ANALYSIS_NAME => self.initial_analysis = template,
            MISSING_DATA_NAME => self.missing_data = template,
            category => {
                self.categories.insert(category.to_string(), template);
            }
        }
    }

    pub fn template(&self, category: &str) -> Option<&str> {
        self.categories.get(category).map(String::as_str)
    }

    pub fn initial_analysis(&self) -> &str {
        &self.initial_analysis
    }

    /// Handcrafted template when one is registered, otherwise a generic prompt.
    pub fn extraction_prompt(&self, step: &AnalysisStep) -> String {
        match self.template(&step.category) {
            Some(template) => template.to_string(),
            None => {
                tracing::info!(
                    category = %step.category,
                    "no handcrafted prompt, building a generic one"
                );
                build_extraction_prompt(step)
            }
        }
    }

    pub fn followup_prompt<S: AsRef<str>>(
        &self,
        result: &AnalysisResult,
        categories: &[S],
        missing: &MissingData,
    ) -> String {
        build_followup_prompt(&self.missing_data, result, categories, missing)
    }
}

/// Synthesize an extraction prompt shaped by the step kind.
pub fn build_extraction_prompt(step: &AnalysisStep) -> String {
    let category = &step.category;
    let key = json_string(category);
    let quantity = if step.kind.is_plural() { "all " } else { "" };

    let mut prompt = String::new();
    prompt.push_str(&step.reason);
    prompt.push('\n');
    prompt.push_str(&format!(
        "Use step-by-step reasoning to extract {quantity}{category} from the document.\n"
    ));
    prompt.push_str("Format the result in JSON:\n");

    match &step.kind {
        StepKind::Table { columns } => {
            prompt.push_str(&format!("{{\n  {key}: [\n    {{\n"));
            for (index, column) in columns.iter().enumerate() {
                let separator = if index + 1 < columns.len() { "," } else { "" };
                prompt.push_str(&format!(
                    "      {}: \"Description of the {column}\"{separator}\n",
                    json_string(column)
                ));
            }
            prompt.push_str("    },\n    ...\n  ]\n}\n");
            prompt.push_str(&format!(
                "Use the following fields to describe the table: {}\n",
                columns.join(", ")
            ));
        }
        StepKind::List => {
            prompt.push_str(&format!(
                "{{\n  {key}: [\n    \"description 1\",\n    \"description 2\",\n    ...\n  ]\n}}\n"
            ));
        }
        StepKind::Text => {
            prompt.push_str(&format!("{{\n  {key}: \"Description of the field\"\n}}\n"));
        }
    }

    let (verb, fallback) = if step.kind.is_plural() {
        ("are", "[]")
    } else {
        ("is", "\"Unknown\"")
    };
    prompt.push_str(&format!(
        "If no {category} {verb} found, return {{{key}: {fallback}}}.\n"
    ));
    prompt.push_str(JSON_ONLY);
    prompt
}

/// Render the missing-data follow-up prompt.
///
/// `categories` lists every requested category; `missing` names the unmet
/// ones with their reasons.
pub fn build_followup_prompt<S: AsRef<str>>(
    template: &str,
    result: &AnalysisResult,
    categories: &[S],
    missing: &MissingData,
) -> String {
    let analysis_categories = std::iter::once(DOCUMENT_TYPE_KEY)
        .chain(
            categories
                .iter()
                .map(AsRef::as_ref)
                .filter(|category| *category != DOCUMENT_TYPE_KEY),
        )
        .collect::<Vec<_>>()
        .join(", ");
    let missing_categories = missing.categories().collect::<Vec<_>>().join(", ");
    let missing_data = missing
        .iter()
        .map(|(category, reason)| format!("- {category} {reason}"))
        .collect::<Vec<_>>()
        .join("\n");
    let analysis_result = result.to_pretty_json();

    render_template(
        template,
        &[
            ("analysis_result", analysis_result.as_str()),
            ("analysis_categories", analysis_categories.as_str()),
            ("missing_categories", missing_categories.as_str()),
            ("missing_data", missing_data.as_str()),
        ],
    )
}

/// Prior answers of the current pass, shown to every later prompt.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    answers: Vec<String>,
}

impl ExtractionContext {
    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push(answer.into());
    }

    /// Append the prior answers to `prompt`.
    pub fn apply(&self, prompt: &str) -> String {
        if self.answers.is_empty() || prompt.is_empty() {
            return prompt.to_string();
        }
        let mut out = String::from(prompt);
        out.push('\n');
        out.push_str(ALREADY_EXTRACTED);
        out.push('\n');
        for answer in &self.answers {
            out.push_str(answer);
            out.push('\n');
        }
        out
    }
}

fn json_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
