//! Workspace configuration helpers.
//!
//! Loads, validates, and normalizes `config.json` and turns it into the
//! concrete engine and prompt registry for a run.
use crate::engine::{
    CommandBackend, HttpBackend, LmBackend, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use crate::paths::WorkspacePaths;
use crate::prompts::PromptRegistry;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current schema version for `config.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Iteration budget shared by step determination and extraction.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;
/// Environment fallback for the LM command.
pub const LM_COMMAND_ENV: &str = "DOCSIFT_LM_COMMAND";
/// Command used when nothing else names one.
pub const DEFAULT_LM_COMMAND: &str = "claude -p --model haiku";
/// Environment override for the HTTP engine model.
pub const MODEL_ENV: &str = "OPENAI_MODEL";

/// Workspace-owned analysis config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeConfig {
    pub schema_version: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<String>,
    #[serde(default = "default_record_responses")]
    pub record_responses: bool,
}

/// Which LM transport answers queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    Command {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::Command { command: None }
    }
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_record_responses() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Build the default config written by `docsift init`.
pub fn default_config() -> AnalyzeConfig {
    AnalyzeConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        max_iterations: DEFAULT_MAX_ITERATIONS,
        engine: EngineConfig::default(),
        prompts_dir: None,
        record_responses: true,
    }
}

/// Load `config.json` from the workspace.
pub fn load_config(paths: &WorkspacePaths) -> Result<AnalyzeConfig> {
    let path = paths.config_path();
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: AnalyzeConfig =
        serde_json::from_slice(&bytes).context("parse docsift config JSON")?;
    Ok(config)
}

/// Load and validate the workspace config, or use defaults when it is absent.
pub fn load_config_or_default(paths: &WorkspacePaths) -> Result<AnalyzeConfig> {
    if !paths.config_path().is_file() {
        tracing::debug!(
            path = %paths.config_path().display(),
            "no config file, using defaults"
        );
        return Ok(default_config());
    }
    let config = load_config(paths)?;
    validate_config(&config)
        .with_context(|| format!("invalid config {}", paths.config_path().display()))?;
    Ok(config)
}

/// Persist a config to disk in a stable JSON format.
pub fn write_config(paths: &WorkspacePaths, config: &AnalyzeConfig) -> Result<()> {
    let path = paths.config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create workspace dir")?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize docsift config")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Validate config schema and user-provided values.
pub fn validate_config(config: &AnalyzeConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported docsift config schema_version {}",
            config.schema_version
        ));
    }
    if config.max_iterations == 0 {
        return Err(anyhow!("max_iterations must be at least 1"));
    }
    match &config.engine {
        EngineConfig::Command { command } => {
            if command.as_deref().is_some_and(|cmd| cmd.trim().is_empty()) {
                return Err(anyhow!("engine.command must be non-empty when set"));
            }
        }
        EngineConfig::Http {
            base_url,
            model,
            api_key_env,
        } => {
            if base_url.trim().is_empty() {
                return Err(anyhow!("engine.base_url must be non-empty"));
            }
            if model.as_deref().is_some_and(|model| model.trim().is_empty()) {
                return Err(anyhow!("engine.model must be non-empty when set"));
            }
            if api_key_env.trim().is_empty() {
                return Err(anyhow!("engine.api_key_env must be non-empty"));
            }
        }
    }
    if let Some(rel) = config.prompts_dir.as_deref() {
        validate_relative_path(rel, "prompts_dir")?;
    }
    Ok(())
}

/// Resolve the LM command: explicit flag > config > env var > default.
pub fn resolve_lm_command(explicit: Option<&str>, config: &AnalyzeConfig) -> String {
    let configured = match &config.engine {
        EngineConfig::Command { command } => command.as_deref(),
        EngineConfig::Http { .. } => None,
    };
    pick_lm_command(explicit, configured, std::env::var(LM_COMMAND_ENV).ok())
}

fn pick_lm_command(
    explicit: Option<&str>,
    configured: Option<&str>,
    from_env: Option<String>,
) -> String {
    explicit
        .or(configured)
        .map(|s| s.to_string())
        .or_else(|| from_env.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LM_COMMAND.to_string())
}

/// Build the transport for a run. An explicit `--lm` always selects the
/// command backend.
pub fn build_backend(
    config: &AnalyzeConfig,
    explicit_lm: Option<&str>,
) -> Result<Box<dyn LmBackend>> {
    if let (
        EngineConfig::Http {
            base_url,
            model,
            api_key_env,
        },
        None,
    ) = (&config.engine, explicit_lm)
    {
        let model = model
            .clone()
            .or_else(|| std::env::var(MODEL_ENV).ok().filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = std::env::var(api_key_env).ok().filter(|key| !key.is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %api_key_env, "no API key set, sending unauthenticated requests");
        }
        let backend = HttpBackend::new(base_url, &model, api_key);
        tracing::info!(endpoint = backend.endpoint(), model = %model, "using HTTP engine");
        return Ok(Box::new(backend));
    }

    let command = resolve_lm_command(explicit_lm, config);
    let backend = CommandBackend::new(&command)?;
    tracing::info!(program = backend.program(), "using command engine");
    Ok(Box::new(backend))
}

/// Built-in prompts plus any overrides from the configured prompts dir.
pub fn build_registry(config: &AnalyzeConfig, paths: &WorkspacePaths) -> Result<PromptRegistry> {
    let mut registry = PromptRegistry::builtin();
    if let Some(rel) = config.prompts_dir.as_deref() {
        let dir = paths.prompts_dir(rel);
        let loaded = registry.load_overrides(&dir)?;
        tracing::info!(dir = %dir.display(), loaded, "loaded prompt overrides");
    }
    Ok(registry)
}

fn validate_relative_path(rel: &str, label: &str) -> Result<()> {
    let path = Path::new(rel);
    if rel.trim().is_empty() || path.is_absolute() || has_parent_components(path) {
        return Err(anyhow!(
            "{label} must be a relative path without '..' (got {rel:?})"
        ));
    }
    Ok(())
}

fn has_parent_components(path: &Path) -> bool {
    path.components()
        .any(|component| matches!(component, std::path::Component::ParentDir))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
