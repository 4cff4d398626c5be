use super::*;
use crate::completeness::MissingReason;
use crate::response_log::NullRecorder;
use crate::schema::StepKind;
use anyhow::anyhow;
use serde_json::json;
use std::collections::VecDeque;
use std::path::PathBuf;

/// Engine replaying queued answers; the last answer of each queue repeats.
#[derive(Default)]
struct ScriptedEngine {
    step_answers: VecDeque<String>,
    answers: VecDeque<String>,
    step_calls: usize,
    prompts: Vec<String>,
}

impl ScriptedEngine {
    fn new(step_answers: &[&str], answers: &[&str]) -> Self {
        Self {
            step_answers: step_answers.iter().map(|s| s.to_string()).collect(),
            answers: answers.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

fn next_answer(queue: &mut VecDeque<String>) -> Result<String> {
    match queue.len() {
        0 => Err(anyhow!("script exhausted")),
        1 => Ok(queue[0].clone()),
        _ => Ok(queue.pop_front().unwrap_or_default()),
    }
}

impl QueryEngine for ScriptedEngine {
    fn determine_steps(&mut self, _source: &Path) -> Result<String> {
        self.step_calls += 1;
        next_answer(&mut self.step_answers)
    }

    fn answer(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        next_answer(&mut self.answers)
    }
}

#[derive(Default)]
struct MemoryRecorder {
    labels: Vec<String>,
    responses: Vec<Value>,
}

impl ResponseRecorder for MemoryRecorder {
    fn record(&mut self, _prompt: &str, response: &Value, label: &str) -> Result<()> {
        self.labels.push(label.to_string());
        self.responses.push(response.clone());
        Ok(())
    }
}

struct FailingRecorder;

impl ResponseRecorder for FailingRecorder {
    fn record(&mut self, _prompt: &str, _response: &Value, _label: &str) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

struct Source {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

fn source() -> Source {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nda.txt");
    std::fs::write(&path, "This NDA is between Acme Corp and Beta LLC.").expect("write source");
    Source { _dir: dir, path }
}

const NDA_STEPS: &str = r#"{
  "document_type": "NDA",
  "analysis_steps": [
    {"category": "parties", "applicable": true, "type": "list", "reason": "Who is bound."}
  ]
}"#;

#[test]
fn nda_gap_is_filled_by_followup() {
    let source = source();
    let mut engine = ScriptedEngine::new(
        &[NDA_STEPS],
        &[
            r#"{"parties": []}"#,
            r#"{"categories": {"parties": ["Acme Corp", "Beta LLC"]}}"#,
        ],
    );
    let mut recorder = MemoryRecorder::default();
    let prompts = PromptRegistry::builtin();

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert!(run.complete);
    assert_eq!(run.iterations, 2);
    assert_eq!(run.step_attempts, 1);
    assert_eq!(run.result.get("document_type"), Some(&json!("NDA")));
    assert_eq!(
        run.result.get("parties"),
        Some(&json!(["Acme Corp", "Beta LLC"]))
    );
    assert!(run.missing.is_empty());

    assert_eq!(engine.prompts.len(), 2);
    assert!(engine.prompts[1].contains("- parties is empty in analysis result"));
    assert_eq!(recorder.labels[0], STEPS_LABEL);
    assert_eq!(recorder.labels[1], "parties");
    assert!(recorder.labels[2].starts_with(FOLLOWUP_LABEL_PREFIX));
    assert_eq!(recorder.labels[2].len(), FOLLOWUP_LABEL_PREFIX.len() + 64);
}

#[test]
fn extraction_stops_at_iteration_budget() {
    let source = source();
    let mut engine = ScriptedEngine::new(&[NDA_STEPS], &[r#"{"parties": []}"#]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert!(!run.complete);
    assert_eq!(run.iterations, DEFAULT_MAX_ITERATIONS);
    assert_eq!(
        run.missing.iter().collect::<Vec<_>>(),
        vec![("parties", MissingReason::Empty)]
    );
    // One full pass then one follow-up per remaining iteration.
    assert_eq!(engine.prompts.len(), DEFAULT_MAX_ITERATIONS);
}

#[test]
fn loose_step_fields_are_accepted_on_first_attempt() {
    let source = source();
    let mut engine = ScriptedEngine::new(
        &[r#"{"document_type": "NDA", "analysis_steps": [
            {"category": "parties", "applicable": true, "type": "list", "columns": null,
             "reason": "Who is bound."},
            {"category": "risks", "applicable": false, "type": "list"}
        ]}"#],
        &[r#"{"parties": ["Acme Corp", "Beta LLC"]}"#],
    );
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert_eq!(engine.step_calls, 1);
    assert_eq!(run.step_attempts, 1);
    assert_eq!(run.steps.categories(), vec!["parties"]);
    assert_eq!(run.steps.analysis_steps[0].kind, StepKind::List);
    assert!(run.complete);
}

#[test]
fn invalid_step_sets_are_retried() {
    let source = source();
    let mut engine = ScriptedEngine::new(
        &[
            "not json at all",
            r#"{"analysis_steps": []}"#,
            r#"{"document_type": "NDA", "analysis_steps": [
                {"category": "parties", "applicable": false, "type": "list", "reason": "x"}
            ]}"#,
            NDA_STEPS,
        ],
        &[r#"{"parties": ["Acme Corp"]}"#],
    );
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert_eq!(run.step_attempts, 4);
    assert_eq!(engine.step_calls, 4);
    assert!(run.complete);
    assert_eq!(run.iterations, 1);
}

#[test]
fn step_exhaustion_returns_none() {
    let source = source();
    let mut engine = ScriptedEngine::new(&[r#"{"document_type": "NDA"}"#], &[]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let outcome = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .with_max_iterations(3)
        .run(&source.path)
        .expect("exhaustion is not an error");

    assert!(outcome.is_none());
    assert_eq!(engine.step_calls, 3);
    assert!(engine.prompts.is_empty());
}

#[test]
fn missing_source_is_invalid_input() {
    let mut engine = ScriptedEngine::new(&[NDA_STEPS], &[]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let err = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(Path::new("/nonexistent/docsift/nda.txt"))
        .expect_err("missing source");

    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::MissingSource(_))
    ));
    assert_eq!(engine.step_calls, 0);
}

#[test]
fn unparseable_answer_keeps_raw_text() {
    let source = source();
    let steps = r#"{"document_type": "NDA", "analysis_steps": [
        {"category": "governing_law", "applicable": true, "type": "text", "reason": "Jurisdiction."}
    ]}"#;
    let mut engine = ScriptedEngine::new(&[steps], &["  New York law applies.\n"]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = MemoryRecorder::default();

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert_eq!(
        run.result.get("governing_law"),
        Some(&json!("New York law applies."))
    );
    assert!(run.complete);
    assert_eq!(recorder.responses[1], json!("New York law applies."));
}

#[test]
fn later_prompts_see_earlier_answers() {
    let source = source();
    let steps = r#"{"document_type": "Lease", "analysis_steps": [
        {"category": "parties", "applicable": true, "type": "list", "reason": "Who signs."},
        {"category": "rent", "applicable": true, "type": "text", "reason": "Monthly rent."}
    ]}"#;
    let mut engine = ScriptedEngine::new(
        &[steps],
        &[
            "```json\n{\"parties\": [\"Landlord Inc\"]}\n```",
            r#"{"rent": "$1,000"}"#,
        ],
    );
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert!(run.complete);
    assert!(engine.prompts[0].contains(r#"{"document_type":"Lease"}"#));
    assert!(!engine.prompts[0].contains("Landlord Inc"));
    assert!(engine.prompts[1].contains(r#"{"parties": ["Landlord Inc"]}"#));
    assert!(!engine.prompts[1].contains("```"));
}

#[test]
fn handcrafted_template_is_used_for_known_category() {
    let source = source();
    let steps = r#"{"document_type": "Services Agreement", "analysis_steps": [
        {"category": "obligations", "applicable": true, "type": "table",
         "columns": ["Party", "Obligation"], "reason": "Duties."}
    ]}"#;
    let mut engine = ScriptedEngine::new(
        &[steps],
        &[r#"{"obligations": [{"party": "Acme", "obligation": "Pay", "deadline": "Unknown"}]}"#],
    );
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    let template = prompts.template("obligations").expect("builtin template");
    assert!(engine.prompts[0].starts_with(template));
}

#[test]
fn non_object_answer_is_stored_under_category() {
    let source = source();
    let mut engine = ScriptedEngine::new(&[NDA_STEPS], &[r#"["Acme Corp"]"#]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert_eq!(run.result.get("parties"), Some(&json!(["Acme Corp"])));
}

#[test]
fn unparseable_followup_leaves_result_unchanged() {
    let source = source();
    let mut engine = ScriptedEngine::new(
        &[NDA_STEPS],
        &[r#"{"parties": []}"#, "sorry, I cannot help", r#"{"categories": {"parties": ["Acme Corp"]}}"#],
    );
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");

    assert!(run.complete);
    assert_eq!(run.iterations, 3);
    assert_eq!(run.result.get("parties"), Some(&json!(["Acme Corp"])));
}

#[test]
fn recorder_failures_do_not_abort_the_run() {
    let source = source();
    let mut engine = ScriptedEngine::new(&[NDA_STEPS], &[r#"{"parties": ["Acme Corp"]}"#]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = FailingRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");
    assert!(run.complete);
}

#[test]
fn engine_failures_propagate() {
    let source = source();
    let mut engine = ScriptedEngine::new(&[NDA_STEPS], &[]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let err = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .run(&source.path)
        .expect_err("transport failure");
    assert!(err.to_string().contains("script exhausted"));
}

#[test]
fn run_serializes_for_cli_output() {
    let source = source();
    let mut engine = ScriptedEngine::new(&[NDA_STEPS], &[r#"{"parties": []}"#]);
    let prompts = PromptRegistry::builtin();
    let mut recorder = NullRecorder;

    let run = Orchestrator::new(&mut engine, &mut recorder, &prompts)
        .with_max_iterations(1)
        .run(&source.path)
        .expect("run")
        .expect("steps accepted");
    let value = serde_json::to_value(&run).expect("serialize run");

    assert_eq!(value["analysis"]["parties"], json!([]));
    assert_eq!(value["steps"]["document_type"], "NDA");
    assert_eq!(value["iterations"], 1);
    assert_eq!(value["complete"], false);
    assert_eq!(value["missing"]["parties"], "is empty in analysis result");
    assert!(value.get("step_attempts").is_none());
}
