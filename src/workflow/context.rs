use crate::cli::EngineArgs;
use crate::config::{self, AnalyzeConfig};
use crate::engine::{LmBackend, LmQueryEngine};
use crate::paths::{resolve_workspace, WorkspacePaths};
use crate::prompts::PromptRegistry;
use crate::response_log::{JsonlRecorder, NullRecorder, ResponseRecorder};
use anyhow::{anyhow, Result};

/// Workspace state shared by the LM-driven commands.
pub(crate) struct RunContext {
    pub(crate) paths: WorkspacePaths,
    pub(crate) config: AnalyzeConfig,
    pub(crate) prompts: PromptRegistry,
    lm: Option<String>,
    max_iterations: usize,
}

impl RunContext {
    pub(crate) fn load(args: &EngineArgs) -> Result<Self> {
        let root = resolve_workspace(args.workspace.as_deref())?;
        let paths = WorkspacePaths::new(root);
        let config = config::load_config_or_default(&paths)?;
        let prompts = config::build_registry(&config, &paths)?;

        let max_iterations = args.max_iterations.unwrap_or(config.max_iterations);
        if max_iterations == 0 {
            return Err(anyhow!("--max-iterations must be at least 1"));
        }

        Ok(Self {
            paths,
            config,
            prompts,
            lm: args.lm.clone(),
            max_iterations,
        })
    }

    pub(crate) fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub(crate) fn engine(&self) -> Result<LmQueryEngine<Box<dyn LmBackend>>> {
        let backend = config::build_backend(&self.config, self.lm.as_deref())?;
        Ok(LmQueryEngine::new(
            backend,
            self.prompts.initial_analysis(),
        ))
    }

    pub(crate) fn recorder(&self) -> Box<dyn ResponseRecorder> {
        if self.config.record_responses {
            Box::new(JsonlRecorder::new(self.paths.responses_path()))
        } else {
            Box::new(NullRecorder)
        }
    }
}
