//! Interactive session with the restaurant agent.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use uuid::Uuid;

/// Run the interactive chat command.
pub async fn run_chat(thread: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Agent, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'muse doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let agent = orchestrator.agent();
    let mut thread_id = thread.unwrap_or_else(new_thread_id);

    println!("\n{}", style("Muse Chat").bold().cyan());
    println!(
        "{}",
        style("Ask about the menu, or 'exit' to quit. Use 'new' to start a fresh thread.").dim()
    );
    println!("{}\n", style(format!("Thread: {}", thread_id)).dim());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("new") {
            thread_id = new_thread_id();
            Output::info(&format!("Started thread {}", thread_id));
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = agent.run(&thread_id, input, None).await;
        spinner.finish_and_clear();

        match result {
            Ok(turn) => {
                for call in &turn.tool_calls {
                    Output::tool_call(call);
                }
                println!("\n{} {}\n", style("Muse:").cyan().bold(), turn.content);
                for artifact in &turn.artifacts {
                    Output::artifact(artifact);
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    orchestrator.shutdown();
    Ok(())
}

fn new_thread_id() -> String {
    format!("cli-{}", Uuid::new_v4())
}
