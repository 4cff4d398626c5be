//! Typed paths into a docsift workspace.
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the workspace when `--workspace` is absent.
pub const WORKSPACE_ENV: &str = "DOCSIFT_WORKSPACE";

/// Locates the files a workspace owns.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the `config.json` path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Return the `data/` directory path.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Return the `data/llm_responses.jsonl` path.
    pub fn responses_path(&self) -> PathBuf {
        self.data_dir().join("llm_responses.jsonl")
    }

    /// Resolve a workspace-relative prompts directory.
    pub fn prompts_dir(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

/// Pick the workspace root: explicit flag, then `DOCSIFT_WORKSPACE`, then the
/// per-user data directory.
pub fn resolve_workspace(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(WORKSPACE_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.local/share/docsift
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(data_dir.join("docsift"))
}
