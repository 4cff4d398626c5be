//! `docsift validate` and `docsift check` need no LM.

mod common;

use common::{stderr, stdout, TestFixture};
use serde_json::Value;

const STEPS: &str = r#"{
  "document_type": "Lease",
  "analysis_steps": [
    {"category": "parties", "applicable": true, "type": "list", "reason": "Who signs."},
    {"category": "rent", "applicable": true, "type": "text", "reason": "Monthly rent."},
    {"category": "risks", "applicable": false, "type": "list", "reason": "n/a"}
  ]
}"#;

#[test]
fn validate_accepts_well_formed_step_set() {
    let fixture = TestFixture::new();
    let steps = fixture.write("steps.json", STEPS);

    let output = fixture.docsift(["validate".as_ref(), steps.as_os_str()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("valid: Lease with 2 applicable steps"));
}

#[test]
fn validate_accepts_null_columns_and_bare_declined_steps() {
    let fixture = TestFixture::new();
    let steps = fixture.write(
        "steps.json",
        r#"{"document_type": "Lease", "analysis_steps": [
            {"category": "parties", "applicable": true, "type": "list", "columns": null,
             "reason": "Who signs."},
            {"category": "risks", "applicable": false}
        ]}"#,
    );

    let output = fixture.docsift(["validate".as_ref(), steps.as_os_str()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("valid: Lease with 1 applicable steps"));
}

#[test]
fn validate_rejects_step_without_type() {
    let fixture = TestFixture::new();
    let steps = fixture.write(
        "steps.json",
        r#"{"document_type": "Lease", "analysis_steps": [
            {"category": "rent", "applicable": true, "reason": "Monthly rent."}
        ]}"#,
    );

    let output = fixture.docsift(["validate".as_ref(), steps.as_os_str()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("type"), "stderr: {}", stderr(&output));
}

#[test]
fn check_reports_missing_categories() {
    let fixture = TestFixture::new();
    let steps = fixture.write("steps.json", STEPS);
    let result = fixture.write(
        "result.json",
        r#"{"document_type": "Lease", "parties": [], "rent": "Unknown"}"#,
    );

    let output = fixture.docsift([
        "check".as_ref(),
        result.as_os_str(),
        "--steps".as_ref(),
        steps.as_os_str(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: Value = serde_json::from_str(&stdout(&output)).expect("stdout is JSON");
    assert_eq!(report["complete"], false);
    assert_eq!(report["missing"]["parties"], "is empty in analysis result");
    assert_eq!(report["missing"]["rent"], "is Unknown in analysis result");
    assert!(report["missing"].get("risks").is_none());
}

#[test]
fn check_rejects_non_object_result() {
    let fixture = TestFixture::new();
    let steps = fixture.write("steps.json", STEPS);
    let result = fixture.write("result.json", "[]");

    let output = fixture.docsift([
        "check".as_ref(),
        result.as_os_str(),
        "--steps".as_ref(),
        steps.as_os_str(),
    ]);
    assert!(!output.status.success());
}
