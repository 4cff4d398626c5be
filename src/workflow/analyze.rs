//! Analyze and steps commands.
use super::RunContext;
use crate::cli::{AnalyzeArgs, StepsArgs};
use crate::orchestrator::Orchestrator;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Run the full analysis and write the result JSON.
pub(crate) fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let ctx = RunContext::load(&args.engine)?;
    let mut engine = ctx.engine()?;
    let mut recorder = ctx.recorder();
    let max_iterations = ctx.max_iterations();

    let run = Orchestrator::new(&mut engine, recorder.as_mut(), &ctx.prompts)
        .with_max_iterations(max_iterations)
        .run(&args.file)?
        .ok_or_else(|| steps_failure(&args.file, max_iterations))?;
    tracing::info!(
        step_attempts = run.step_attempts,
        iterations = run.iterations,
        complete = run.complete,
        "analysis finished"
    );

    let text = serde_json::to_string_pretty(&run).context("serialize analysis output")?;
    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::write(path, format!("{text}\n"))
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Run step determination only and print the accepted step set.
pub(crate) fn run_steps(args: &StepsArgs) -> Result<()> {
    let ctx = RunContext::load(&args.engine)?;
    let mut engine = ctx.engine()?;
    let mut recorder = ctx.recorder();
    let max_iterations = ctx.max_iterations();

    let (steps, _attempt) = Orchestrator::new(&mut engine, recorder.as_mut(), &ctx.prompts)
        .with_max_iterations(max_iterations)
        .determine_steps(&args.file)?
        .ok_or_else(|| steps_failure(&args.file, max_iterations))?;

    let text = serde_json::to_string_pretty(&steps).context("serialize analysis steps")?;
    println!("{text}");
    Ok(())
}

fn steps_failure(source: &Path, attempts: usize) -> anyhow::Error {
    anyhow!(
        "could not determine analysis steps for {} after {attempts} attempts",
        source.display()
    )
}
