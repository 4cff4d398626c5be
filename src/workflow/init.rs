//! Workspace init command.
use crate::cli::InitArgs;
use crate::config::{default_config, write_config};
use crate::paths::{resolve_workspace, WorkspacePaths};
use anyhow::{anyhow, Context, Result};
use std::fs;

/// Write a default `config.json` and create the data directory.
pub(crate) fn run_init(args: &InitArgs) -> Result<()> {
    let root = resolve_workspace(args.workspace.as_deref())?;
    let paths = WorkspacePaths::new(root);
    let config_path = paths.config_path();
    if config_path.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }

    write_config(&paths, &default_config())?;
    fs::create_dir_all(paths.data_dir())
        .with_context(|| format!("create {}", paths.data_dir().display()))?;
    println!("wrote {}", config_path.display());
    Ok(())
}
