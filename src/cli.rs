//! CLI argument parsing for docsift.
//!
//! The CLI stays thin: every command resolves a workspace, builds its
//! collaborators, and hands off to the core modules.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "docsift",
    version,
    about = "LM-driven structured extraction from documents",
    after_help = "Commands:\n  analyze <file>                      Determine steps, extract, and fill gaps\n  steps <file>                        Print the accepted analysis steps only\n  validate <steps.json>               Check a step set against the schema\n  check <result.json> --steps <file>  Report missing categories of a result\n  init                                Write a default workspace config\n  responses                           List recorded LM exchanges\n\nExamples:\n  docsift init --workspace /tmp/ws\n  docsift analyze contract.txt --workspace /tmp/ws --out analysis.json\n  docsift analyze nda.txt --lm 'ollama run llama3'\n  docsift check analysis.json --steps steps.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Analyze(AnalyzeArgs),
    Steps(StepsArgs),
    Validate(ValidateArgs),
    Check(CheckArgs),
    Init(InitArgs),
    Responses(ResponsesArgs),
}

impl Command {
    /// Whether the command asked for debug-level logging.
    pub fn verbose(&self) -> bool {
        match self {
            Self::Analyze(args) => args.verbose,
            Self::Steps(args) => args.verbose,
            Self::Validate(args) => args.verbose,
            Self::Check(_) | Self::Init(_) | Self::Responses(_) => false,
        }
    }
}

/// Options shared by commands that talk to the LM.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Workspace holding config.json, data/, and prompt overrides
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// LM command (prompt on stdin, answer on stdout); overrides the config
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Per-phase iteration budget; overrides the config
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,
}

/// Analyze command inputs.
#[derive(Parser, Debug)]
#[command(about = "Analyze a document and write the extracted result")]
pub struct AnalyzeArgs {
    /// Source document to analyze
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Write the JSON output here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Emit debug logs, including prompt contents
    #[arg(long)]
    pub verbose: bool,
}

/// Steps command inputs.
#[derive(Parser, Debug)]
#[command(about = "Determine and print the analysis steps for a document")]
pub struct StepsArgs {
    /// Source document to analyze
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Emit debug logs, including prompt contents
    #[arg(long)]
    pub verbose: bool,
}

/// Validate command inputs.
#[derive(Parser, Debug)]
#[command(about = "Validate a step-set JSON file")]
pub struct ValidateArgs {
    /// Step-set JSON file
    #[arg(value_name = "STEPS_JSON")]
    pub steps: PathBuf,

    /// Emit debug logs
    #[arg(long)]
    pub verbose: bool,
}

/// Check command inputs.
#[derive(Parser, Debug)]
#[command(about = "Report which categories of a result still need data")]
pub struct CheckArgs {
    /// Analysis result JSON file
    #[arg(value_name = "RESULT_JSON")]
    pub result: PathBuf,

    /// Step-set JSON file naming the required categories
    #[arg(long, value_name = "STEPS_JSON")]
    pub steps: PathBuf,
}

/// Init command inputs.
#[derive(Parser, Debug)]
#[command(about = "Initialize a workspace with a default config")]
pub struct InitArgs {
    /// Workspace to initialize
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Overwrite an existing config.json
    #[arg(long)]
    pub force: bool,
}

/// Responses command inputs.
#[derive(Parser, Debug)]
#[command(about = "List LM exchanges recorded in a workspace")]
pub struct ResponsesArgs {
    /// Workspace holding data/llm_responses.jsonl
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Emit the full entries as JSON
    #[arg(long)]
    pub json: bool,
}
