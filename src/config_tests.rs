use super::*;
use serde_json::json;

fn parse(value: serde_json::Value) -> AnalyzeConfig {
    serde_json::from_value(value).expect("parse config")
}

#[test]
fn minimal_config_fills_defaults() {
    let config = parse(json!({"schema_version": 1}));
    assert_eq!(config, default_config());
    validate_config(&config).expect("defaults are valid");
}

#[test]
fn written_config_loads_back() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = WorkspacePaths::new(dir.path().to_path_buf());
    write_config(&paths, &default_config()).expect("write config");

    let loaded = load_config_or_default(&paths).expect("load config");
    assert_eq!(loaded, default_config());
    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(paths.config_path()).expect("read config"),
    )
    .expect("config is JSON");
    assert_eq!(written["engine"]["kind"], "command");
    assert_eq!(written["record_responses"], true);
}

#[test]
fn missing_config_means_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = WorkspacePaths::new(dir.path().join("fresh"));
    assert_eq!(
        load_config_or_default(&paths).expect("defaults"),
        default_config()
    );
}

#[test]
fn unknown_fields_are_rejected() {
    let err = serde_json::from_value::<AnalyzeConfig>(json!({
        "schema_version": 1,
        "max_iteration": 3
    }))
    .expect_err("typo must fail");
    assert!(err.to_string().contains("max_iteration"));
}

#[test]
fn http_engine_defaults() {
    let config = parse(json!({"schema_version": 1, "engine": {"kind": "http"}}));
    assert_eq!(
        config.engine,
        EngineConfig::Http {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    );
}

#[test]
fn validate_rejects_bad_values() {
    let mut config = default_config();
    config.schema_version = 2;
    assert!(validate_config(&config).is_err());

    let mut config = default_config();
    config.max_iterations = 0;
    assert!(validate_config(&config).is_err());

    let mut config = default_config();
    config.engine = EngineConfig::Command {
        command: Some("  ".to_string()),
    };
    assert!(validate_config(&config).is_err());

    let mut config = default_config();
    config.engine = EngineConfig::Http {
        base_url: DEFAULT_BASE_URL.to_string(),
        model: Some(String::new()),
        api_key_env: DEFAULT_API_KEY_ENV.to_string(),
    };
    assert!(validate_config(&config).is_err());

    for rel in ["/etc/prompts", "../prompts", "prompts/../../x", ""] {
        let mut config = default_config();
        config.prompts_dir = Some(rel.to_string());
        assert!(validate_config(&config).is_err(), "{rel:?} should be rejected");
    }
}

#[test]
fn lm_command_priority() {
    assert_eq!(
        pick_lm_command(Some("flag"), Some("config"), Some("env".to_string())),
        "flag"
    );
    assert_eq!(
        pick_lm_command(None, Some("config"), Some("env".to_string())),
        "config"
    );
    assert_eq!(pick_lm_command(None, None, Some("env".to_string())), "env");
    assert_eq!(pick_lm_command(None, None, None), DEFAULT_LM_COMMAND);
    assert_eq!(
        pick_lm_command(None, None, Some(" ".to_string())),
        DEFAULT_LM_COMMAND
    );
}

#[test]
fn registry_applies_prompt_overrides() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = WorkspacePaths::new(dir.path().to_path_buf());
    std::fs::create_dir_all(dir.path().join("prompts")).expect("create prompts dir");
    std::fs::write(dir.path().join("prompts/parties.md"), "List the parties.")
        .expect("write prompt");

    let mut config = default_config();
    config.prompts_dir = Some("prompts".to_string());
    let registry = build_registry(&config, &paths).expect("build registry");
    assert_eq!(registry.template("parties"), Some("List the parties."));
    assert!(registry.template("obligations").is_some());
}

#[test]
fn explicit_lm_selects_command_backend() {
    let mut config = default_config();
    config.engine = EngineConfig::Http {
        base_url: DEFAULT_BASE_URL.to_string(),
        model: None,
        api_key_env: DEFAULT_API_KEY_ENV.to_string(),
    };
    assert!(build_backend(&config, Some("cat")).is_ok());
    assert!(build_backend(&config, Some("'unterminated")).is_err());
}
