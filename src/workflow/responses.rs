//! Listing of recorded LM exchanges.
use crate::cli::ResponsesArgs;
use crate::paths::{resolve_workspace, WorkspacePaths};
use crate::response_log::load_records;
use crate::util::truncate_string;
use anyhow::{Context, Result};

pub(crate) fn run_responses(args: &ResponsesArgs) -> Result<()> {
    let paths = WorkspacePaths::new(resolve_workspace(args.workspace.as_deref())?);
    let records = load_records(&paths.responses_path())?;

    if args.json {
        let text = serde_json::to_string_pretty(&records).context("serialize response log")?;
        println!("{text}");
        return Ok(());
    }

    for record in &records {
        let response = serde_json::to_string(&record.data.response)
            .context("serialize recorded response")?;
        println!(
            "{}\t{}\t{}",
            record.ts,
            record.key,
            truncate_string(&response, 80)
        );
    }
    Ok(())
}
