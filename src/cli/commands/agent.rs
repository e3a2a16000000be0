//! Agent command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run a single agent turn.
pub async fn run_agent(prompt: &str, thread: &str, image: Option<PathBuf>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Agent, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'muse doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(path) = &image {
        if !path.is_file() {
            anyhow::bail!("Image not found: {}", path.display());
        }
    }

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Agent working...");
    let result = orchestrator
        .agent()
        .run(thread, prompt, image.as_deref())
        .await;
    spinner.finish_and_clear();

    let turn = match result {
        Ok(turn) => turn,
        Err(e) => {
            Output::error(&format!("Agent failed: {}", e));
            orchestrator.shutdown();
            return Err(e.into());
        }
    };

    println!("\n{}\n", turn.content);

    if !turn.tool_calls.is_empty() {
        Output::header(&format!("Tool calls ({})", turn.tool_calls.len()));
        for call in &turn.tool_calls {
            Output::tool_call(call);
        }
        println!();
    }

    if !turn.artifacts.is_empty() {
        Output::header("Generated media");
        for artifact in &turn.artifacts {
            Output::artifact(artifact);
        }
        println!();
    }

    Output::info(&format!("Completed in {} model call(s)", turn.iterations));
    orchestrator.shutdown();
    Ok(())
}
